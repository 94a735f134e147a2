//! Classfile header parser.
//!
//! Continues after the constant pool: access flags, this/super/interface
//! names, the field table (only static final fields with a registered match
//! and a `ConstantValue` attribute are decoded), the method table (skipped)
//! and class-level `RuntimeVisibleAnnotations`. Class bodies and bytecode
//! are never parsed.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use serde::Serialize;

use crate::error::ClassfileError;
use crate::pool::{ClassReader, ConstantPool, PoolEntry};

/// The root of the class hierarchy; it has no superclass to link.
pub const ROOT_OBJECT: &str = "java.lang.Object";

const ACC_INTERFACE: u16 = 0x0200;
const ACC_STATIC_FINAL: u16 = 0x0018;

/// Decoded literal of a `ConstantValue` attribute, coerced to the field's
/// declared descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

/// A static final field whose constant initializer matched a registration.
/// `callback` indexes the scanner's field callback table.
#[derive(Debug)]
pub struct FieldMatch {
    pub field: String,
    pub value: ConstantValue,
    pub(crate) callback: usize,
}

/// Everything the header parser extracts from one classfile.
#[derive(Debug)]
pub struct ClassfileInfo {
    pub name: String,
    pub is_interface: bool,
    pub superclass: String,
    pub interfaces: Vec<String>,
    pub annotations: Vec<String>,
    pub field_matches: Vec<FieldMatch>,
}

/// Parses one classfile header from a stream.
///
/// Returns `Ok(None)` when the stream is not a classfile, when it encodes the
/// root object type, or when the qualified name was already seen this scan
/// (shadowing: the first occurrence on the path wins). The encountered set is
/// updated as soon as the class name is known, so later duplicates are masked
/// even if this file turns out to be malformed further down.
pub(crate) fn read_classfile_header<R: Read>(
    input: R,
    encountered: &mut HashSet<String>,
    field_targets: &HashMap<String, HashMap<String, usize>>,
) -> Result<Option<ClassfileInfo>, ClassfileError> {
    let mut r = ClassReader::new(input);
    let Some(pool) = ConstantPool::read(&mut r)? else {
        return Ok(None);
    };

    let flags = r.read_u16()?;
    let is_interface = flags & ACC_INTERFACE != 0;

    let name = pool.read_indirect_string(&mut r)?.replace('/', ".");
    if name == ROOT_OBJECT {
        return Ok(None);
    }
    if !encountered.insert(name.clone()) {
        return Ok(None);
    }

    let superclass = pool.read_indirect_string(&mut r)?.replace('/', ".");

    let interface_count = r.read_u16()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(pool.read_indirect_string(&mut r)?.replace('/', "."));
    }

    let wanted_fields = field_targets.get(&name);
    let mut field_matches = Vec::new();
    let field_count = r.read_u16()?;
    for _ in 0..field_count {
        read_field(
            &mut r,
            &pool,
            &name,
            wanted_fields,
            &mut field_matches,
        )?;
    }

    // Methods carry nothing this scanner indexes; skip them whole.
    let method_count = r.read_u16()?;
    for _ in 0..method_count {
        r.skip(6)?;
        let attr_count = r.read_u16()?;
        skip_attributes(&mut r, attr_count)?;
    }

    let mut annotations: Vec<String> = Vec::new();
    let attr_count = r.read_u16()?;
    for _ in 0..attr_count {
        let name_idx = r.read_u16()?;
        let attr_len = r.read_u32()?;
        if pool.string_at(name_idx)? == "RuntimeVisibleAnnotations" {
            let annotation_count = r.read_u16()?;
            for _ in 0..annotation_count {
                let annotation = read_annotation(&mut r, &pool)?;
                if !annotations.contains(&annotation) {
                    annotations.push(annotation);
                }
            }
        } else {
            r.skip(u64::from(attr_len))?;
        }
    }

    Ok(Some(ClassfileInfo {
        name,
        is_interface,
        superclass,
        interfaces,
        annotations,
        field_matches,
    }))
}

fn read_field<R: Read>(
    r: &mut ClassReader<R>,
    pool: &ConstantPool,
    class_name: &str,
    wanted_fields: Option<&HashMap<String, usize>>,
    field_matches: &mut Vec<FieldMatch>,
) -> Result<(), ClassfileError> {
    let access = r.read_u16()?;
    let is_static_final = access & ACC_STATIC_FINAL == ACC_STATIC_FINAL;
    let field_name = pool.read_indirect_string(r)?.to_string();
    let target = wanted_fields.and_then(|m| m.get(field_name.as_str())).copied();
    let descriptor = pool.read_indirect_string(r)?.to_string();
    let attr_count = r.read_u16()?;

    match (is_static_final, target) {
        (false, Some(_)) => {
            tracing::warn!(
                class = %class_name,
                field = %field_name,
                "cannot match requested field: it is not both static and final"
            );
            skip_attributes(r, attr_count)?;
        }
        (_, None) => skip_attributes(r, attr_count)?,
        (true, Some(callback)) => {
            let mut emitted = false;
            for _ in 0..attr_count {
                let name_idx = r.read_u16()?;
                let attr_len = r.read_u32()?;
                if !emitted && pool.string_at(name_idx)? == "ConstantValue" {
                    let const_idx = r.read_u16()?;
                    let value = coerce_constant(&descriptor, pool.entry_at(const_idx)?)?;
                    field_matches.push(FieldMatch {
                        field: field_name.clone(),
                        value,
                        callback,
                    });
                    emitted = true;
                } else {
                    r.skip(u64::from(attr_len))?;
                }
            }
            if !emitted {
                tracing::warn!(
                    class = %class_name,
                    field = %field_name,
                    "requested static final field is not initialized with a constant literal"
                );
            }
        }
    }
    Ok(())
}

/// Byte, char, short and boolean constants are all stored as pool integers;
/// narrow them to the declared descriptor. Strings arrive already resolved.
fn coerce_constant(
    descriptor: &str,
    entry: &PoolEntry,
) -> Result<ConstantValue, ClassfileError> {
    let value = match (descriptor, entry) {
        ("B", PoolEntry::Int(v)) => ConstantValue::Byte(*v as i8),
        ("C", PoolEntry::Int(v)) => ConstantValue::Char(
            char::from_u32(*v as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
        ),
        ("S", PoolEntry::Int(v)) => ConstantValue::Short(*v as i16),
        ("Z", PoolEntry::Int(v)) => ConstantValue::Boolean(*v != 0),
        ("I", PoolEntry::Int(v)) => ConstantValue::Int(*v),
        ("J", PoolEntry::Long(v)) => ConstantValue::Long(*v),
        ("F", PoolEntry::Float(v)) => ConstantValue::Float(*v),
        ("D", PoolEntry::Double(v)) => ConstantValue::Double(*v),
        ("Ljava/lang/String;", PoolEntry::Utf8(s)) => ConstantValue::Str(s.clone()),
        _ => return Err(ClassfileError::ConstantMismatch(descriptor.to_string())),
    };
    Ok(value)
}

fn skip_attributes<R: Read>(
    r: &mut ClassReader<R>,
    count: u16,
) -> Result<(), ClassfileError> {
    for _ in 0..count {
        r.skip(2)?;
        let len = r.read_u32()?;
        r.skip(u64::from(len))?;
    }
    Ok(())
}

/// Reads one annotation, returning its qualified name. The element-value
/// pairs are only walked to advance the cursor; nested annotation names are
/// discarded because only top-level class annotations are indexed.
fn read_annotation<R: Read>(
    r: &mut ClassReader<R>,
    pool: &ConstantPool,
) -> Result<String, ClassfileError> {
    let descriptor = pool.read_indirect_string(r)?;
    // Lcom/xyz/Anno; -> com.xyz.Anno
    let name = descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .map(|s| s.replace('/', "."))
        .unwrap_or_else(|| descriptor.to_string());

    let pair_count = r.read_u16()?;
    for _ in 0..pair_count {
        // element_name_index
        r.skip(2)?;
        read_annotation_element_value(r, pool)?;
    }
    Ok(name)
}

fn read_annotation_element_value<R: Read>(
    r: &mut ClassReader<R>,
    pool: &ConstantPool,
) -> Result<(), ClassfileError> {
    let tag = r.read_u8()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => r.skip(2)?,
        b'e' => r.skip(4)?,
        b'c' => r.skip(2)?,
        b'@' => {
            read_annotation(r, pool)?;
        }
        b'[' => {
            let count = r.read_u16()?;
            for _ in 0..count {
                read_annotation_element_value(r, pool)?;
            }
        }
        _ => {}
    }
    Ok(())
}
