//! Binary mesh interchange format
//!
//! A mesh is one sequential big-endian record:
//!
//! ```text
//! i32 draw mode (raw GL enum)
//! i32 vertex count
//! i32 has center   [3 x f32 center]
//! i32 has bound    [6 x f32: min x, y, z, max x, y, z]
//! i32 index count  [N x u16]
//! i32 vertex float count [N x f32]
//! i32 texcoord float count [N x f32]
//! i32 normal float count [N x f32]
//! ```
//!
//! A zero flag or count means the payload that follows is absent. Vertex
//! colors and materials are per instance and not part of the record.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::scene::bounds::AABBox;
use crate::scene::mesh::{DrawMode, Mesh};

// Upper bound on speculative preallocation from untrusted counts
const MAX_PREALLOCATION: usize = 1 << 16;

/// Errors raised while reading or writing a mesh record
#[derive(Error, Debug)]
pub enum MeshFormatError {
    /// Underlying reader or writer failed, including truncated input
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A count or flag field holds a negative value
    #[error("Negative {field} in mesh record: {value}")]
    NegativeCount {
        /// Field name
        field: &'static str,
        /// Value read
        value: i32,
    },
    /// Draw mode is not one of the supported GL enums
    #[error("Unsupported draw mode {0:#x}")]
    UnsupportedDrawMode(i32),
    /// Array lengths disagree with the vertex count
    #[error("Inconsistent mesh record: {0}")]
    Inconsistent(String),
    /// An array is too long for the record's 32-bit counts
    #[error("{0} too long for the mesh record")]
    TooLong(&'static str),
}

/// Write `mesh` as one record
///
/// A dirty model bound is recomputed first so the record carries a bound
/// matching its vertices.
pub fn export_mesh<W: Write>(mesh: &Mesh, writer: &mut W) -> Result<(), MeshFormatError> {
    mesh.update_model_bound();
    let geometry = mesh.geometry();
    check_arrays(
        geometry.vertex_count(),
        geometry.indices(),
        geometry.texcoords().unwrap_or_default(),
        geometry.normals().unwrap_or_default(),
    )?;

    write_i32(writer, geometry.draw_mode().as_raw())?;
    write_count(writer, "vertex count", geometry.vertex_count())?;

    match geometry.center() {
        Some(center) => {
            write_i32(writer, 1)?;
            write_floats(writer, center.as_slice())?;
        }
        None => write_i32(writer, 0)?,
    }

    match geometry.model_bound() {
        Some(bound) => {
            write_i32(writer, 1)?;
            write_floats(writer, bound.min.as_slice())?;
            write_floats(writer, bound.max.as_slice())?;
        }
        None => write_i32(writer, 0)?,
    }

    write_count(writer, "index array", geometry.index_count())?;
    for index in geometry.indices() {
        writer.write_all(&index.to_be_bytes())?;
    }

    write_float_array(writer, "vertex array", geometry.vertices())?;
    write_float_array(writer, "texcoord array", geometry.texcoords().unwrap_or_default())?;
    write_float_array(writer, "normal array", geometry.normals().unwrap_or_default())?;

    log::debug!(
        "Exported mesh with {} vertices and {} indices",
        geometry.vertex_count(),
        geometry.index_count()
    );
    Ok(())
}

/// Read one record into a fresh mesh
pub fn import_mesh<R: Read>(reader: &mut R) -> Result<Mesh, MeshFormatError> {
    let raw_mode = read_i32(reader)?;
    let draw_mode = DrawMode::from_raw(raw_mode).ok_or(MeshFormatError::UnsupportedDrawMode(raw_mode))?;
    let vertex_count = read_count(reader, "vertex count")?;

    let center = if read_flag(reader, "center flag")? {
        let [x, y, z] = read_array::<_, 3>(reader)?;
        Some(Vec3::new(x, y, z))
    } else {
        None
    };

    let bound = if read_flag(reader, "bound flag")? {
        let [x0, y0, z0, x1, y1, z1] = read_array::<_, 6>(reader)?;
        Some(AABBox::from_extremes(x0, y0, z0, x1, y1, z1))
    } else {
        None
    };

    let index_count = read_count(reader, "index count")?;
    let mut indices = Vec::with_capacity(index_count.min(MAX_PREALLOCATION));
    for _ in 0..index_count {
        let mut bytes = [0u8; 2];
        reader.read_exact(&mut bytes)?;
        indices.push(u16::from_be_bytes(bytes));
    }

    let vertices = read_float_array(reader, "vertex float count")?;
    let texcoords = read_float_array(reader, "texcoord count")?;
    let normals = read_float_array(reader, "normal count")?;

    if vertices.len() != vertex_count * 3 {
        return Err(MeshFormatError::Inconsistent(format!(
            "{} vertex floats for {vertex_count} vertices",
            vertices.len()
        )));
    }
    check_arrays(vertex_count, &indices, &texcoords, &normals)?;

    let mesh = Mesh::new();
    mesh.set_draw_mode(draw_mode);
    mesh.set_vertices(&vertices);
    mesh.set_indices(&indices);
    if !texcoords.is_empty() {
        mesh.set_texcoords(&texcoords);
    }
    if !normals.is_empty() {
        mesh.set_normals(&normals);
    }
    if let Some(center) = center {
        mesh.set_center(center);
    }
    match bound {
        Some(bound) => mesh.set_model_bound(bound),
        None => mesh.update_model_bound(),
    }

    log::debug!("Imported mesh with {vertex_count} vertices and {index_count} indices");
    Ok(mesh)
}

/// Read a mesh record from a file
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, MeshFormatError> {
    let path = path.as_ref();
    log::info!("Loading mesh from {}", path.display());
    let mut reader = BufReader::new(File::open(path)?);
    import_mesh(&mut reader)
}

/// Write a mesh record to a file
pub fn save_mesh(mesh: &Mesh, path: impl AsRef<Path>) -> Result<(), MeshFormatError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    export_mesh(mesh, &mut writer)?;
    writer.flush()?;
    log::info!("Saved mesh to {}", path.display());
    Ok(())
}

/// Array lengths and index range a record must satisfy to be read back
fn check_arrays(
    vertex_count: usize,
    indices: &[u16],
    texcoords: &[f32],
    normals: &[f32],
) -> Result<(), MeshFormatError> {
    if !texcoords.is_empty() && texcoords.len() != vertex_count * 2 {
        return Err(MeshFormatError::Inconsistent(format!(
            "{} texcoord floats for {vertex_count} vertices",
            texcoords.len()
        )));
    }
    if !normals.is_empty() && normals.len() != vertex_count * 3 {
        return Err(MeshFormatError::Inconsistent(format!(
            "{} normal floats for {vertex_count} vertices",
            normals.len()
        )));
    }
    if let Some(&index) = indices.iter().find(|&&index| usize::from(index) >= vertex_count) {
        return Err(MeshFormatError::Inconsistent(format!(
            "index {index} out of range for {vertex_count} vertices"
        )));
    }
    Ok(())
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<(), MeshFormatError> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_count<W: Write>(writer: &mut W, what: &'static str, count: usize) -> Result<(), MeshFormatError> {
    let count = i32::try_from(count).map_err(|_| MeshFormatError::TooLong(what))?;
    write_i32(writer, count)
}

fn write_floats<W: Write>(writer: &mut W, values: &[f32]) -> Result<(), MeshFormatError> {
    for value in values {
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

fn write_float_array<W: Write>(writer: &mut W, what: &'static str, values: &[f32]) -> Result<(), MeshFormatError> {
    write_count(writer, what, values.len())?;
    write_floats(writer, values)
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32, MeshFormatError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_be_bytes(bytes))
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32, MeshFormatError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(f32::from_be_bytes(bytes))
}

fn read_count<R: Read>(reader: &mut R, field: &'static str) -> Result<usize, MeshFormatError> {
    let value = read_i32(reader)?;
    usize::try_from(value).map_err(|_| MeshFormatError::NegativeCount { field, value })
}

fn read_flag<R: Read>(reader: &mut R, field: &'static str) -> Result<bool, MeshFormatError> {
    Ok(read_count(reader, field)? != 0)
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[f32; N], MeshFormatError> {
    let mut values = [0.0; N];
    for value in &mut values {
        *value = read_f32(reader)?;
    }
    Ok(values)
}

fn read_float_array<R: Read>(reader: &mut R, field: &'static str) -> Result<Vec<f32>, MeshFormatError> {
    let count = read_count(reader, field)?;
    let mut values = Vec::with_capacity(count.min(MAX_PREALLOCATION));
    for _ in 0..count {
        values.push(read_f32(reader)?);
    }
    Ok(values)
}
