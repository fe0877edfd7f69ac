// ASCII PLY import

use std::path::Path;

use glam::{Vec2, Vec3};

use crate::drawable::{Mesh, Object};

#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    #[error("failed to read PLY file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a PLY file (missing 'ply' magic line)")]
    MissingMagic,
    #[error("unsupported PLY format '{0}', only ascii 1.0 is read")]
    UnsupportedFormat(String),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("vertex element has no '{0}' property")]
    MissingProperty(&'static str),
    #[error("face {face} references vertex {index}, but only {count} vertices exist")]
    IndexOutOfRange { face: usize, index: usize, count: usize },
    #[error("PLY file contains no vertices or no faces")]
    Empty,
}

#[derive(Debug)]
enum Property {
    Scalar { name: String, ty: String },
    List(String),
}

/// Texture coordinate property pairs, in lookup order
const UV_NAMES: [(&str, &str); 3] = [("s", "t"), ("u", "v"), ("texture_u", "texture_v")];

/// Mesh read from a PLY file, with the mean of its vertex colors if it has any.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyModel {
    pub mesh: Mesh,
    pub color: Option<[f32; 3]>,
}

impl PlyModel {
    pub fn into_object(self) -> Object {
        let mut object = Object::ply(self.mesh);
        if let Some(color) = self.color {
            object.set_color(color);
        }
        object
    }
}

struct VertexData {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    color: Option<[f32; 3]>,
}

#[derive(Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    fn scalar_index(&self, name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|property| matches!(property, Property::Scalar { name: n, .. } if n == name))
    }

    /// Divisor bringing a color channel into [0, 1]
    fn channel_scale(&self, index: usize) -> f32 {
        match &self.properties[index] {
            Property::Scalar { ty, .. } if matches!(ty.as_str(), "float" | "float32" | "double" | "float64") => 1.0,
            Property::Scalar { ty, .. } if matches!(ty.as_str(), "ushort" | "uint16") => 65535.0,
            _ => 255.0,
        }
    }

    fn list_index(&self) -> Option<usize> {
        self.properties
            .iter()
            .position(|property| matches!(property, Property::List(_)))
    }
}

pub fn read_ply_file(path: &Path) -> Result<PlyModel, PlyError> {
    let bytes = std::fs::read(path)?;
    parse_ply(&String::from_utf8_lossy(&bytes))
}

pub fn parse_ply(text: &str) -> Result<PlyModel, PlyError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()));

    match lines.next() {
        Some((_, "ply")) => {}
        _ => return Err(PlyError::MissingMagic),
    }

    let elements = read_header(&mut lines)?;
    let mut body = lines.filter(|(_, line)| !line.is_empty());

    let mut vertices = VertexData {
        positions: Vec::new(),
        uvs: Vec::new(),
        color: None,
    };
    let mut triangles = Vec::new();
    for element in &elements {
        match element.name.as_str() {
            "vertex" => vertices = read_vertices(element, &mut body)?,
            "face" => triangles = read_faces(element, &mut body, vertices.positions.len())?,
            _ => {
                for _ in 0..element.count {
                    next_line(&mut body)?;
                }
            }
        }
    }

    if vertices.positions.is_empty() || triangles.is_empty() {
        return Err(PlyError::Empty);
    }
    Ok(PlyModel {
        mesh: Mesh::new(vertices.positions, triangles).with_uvs(vertices.uvs),
        color: vertices.color,
    })
}

fn read_header<'a, I>(lines: &mut I) -> Result<Vec<Element>, PlyError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut elements: Vec<Element> = Vec::new();
    let mut format_seen = false;

    for (line_number, line) in lines.by_ref() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["end_header"] => {
                if !format_seen {
                    return Err(malformed(line_number, "header has no format line"));
                }
                return Ok(elements);
            }
            ["format", format @ ..] => {
                if format != ["ascii", "1.0"] {
                    return Err(PlyError::UnsupportedFormat(format.join(" ")));
                }
                format_seen = true;
            }
            ["comment", ..] | ["obj_info", ..] | [] => {}
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| malformed(line_number, format!("bad element count '{count}'")))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", _, _, name] => {
                current_element(&mut elements, line_number)?
                    .properties
                    .push(Property::List(name.to_string()));
            }
            ["property", ty, name] => {
                current_element(&mut elements, line_number)?.properties.push(Property::Scalar {
                    name: name.to_string(),
                    ty: ty.to_string(),
                });
            }
            _ => return Err(malformed(line_number, format!("unexpected header line '{line}'"))),
        }
    }

    Err(PlyError::Malformed {
        line: 0,
        reason: "missing end_header".to_string(),
    })
}

fn current_element(elements: &mut [Element], line: usize) -> Result<&mut Element, PlyError> {
    elements
        .last_mut()
        .ok_or_else(|| malformed(line, "property declared before any element"))
}

fn read_vertices<'a, I>(element: &Element, body: &mut I) -> Result<VertexData, PlyError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let axis = |name: &'static str| element.scalar_index(name).ok_or(PlyError::MissingProperty(name));
    let (x, y, z) = (axis("x")?, axis("y")?, axis("z")?);
    let uv = UV_NAMES
        .iter()
        .find_map(|(u, v)| Some((element.scalar_index(u)?, element.scalar_index(v)?)));
    let rgb = match (
        element.scalar_index("red"),
        element.scalar_index("green"),
        element.scalar_index("blue"),
    ) {
        (Some(r), Some(g), Some(b)) => Some([r, g, b]),
        _ => None,
    };

    // The header count is untrusted; growth follows the lines actually read
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut color_sum = Vec3::ZERO;
    for _ in 0..element.count {
        let (line_number, line) = next_line(body)?;
        let values = scalar_values(element, line, line_number)?;
        let position = Vec3::new(values[x], values[y], values[z]);
        if !position.is_finite() {
            return Err(malformed(line_number, "non-finite vertex coordinate"));
        }
        positions.push(position);
        if let Some((u, v)) = uv {
            uvs.push(Vec2::new(values[u], values[v]));
        }
        if let Some(channels) = rgb {
            color_sum += Vec3::from(channels.map(|index| values[index] / element.channel_scale(index)));
        }
    }

    let color = rgb
        .filter(|_| !positions.is_empty())
        .map(|_| (color_sum / positions.len() as f32).clamp(Vec3::ZERO, Vec3::ONE).to_array());
    Ok(VertexData { positions, uvs, color })
}

/// Values of the scalar properties of one line, indexed by property position
fn scalar_values(element: &Element, line: &str, line_number: usize) -> Result<Vec<f32>, PlyError> {
    let mut tokens = line.split_whitespace();
    let mut values = Vec::with_capacity(element.properties.len());
    for property in &element.properties {
        match property {
            Property::Scalar { name, .. } => {
                let token = tokens
                    .next()
                    .ok_or_else(|| malformed(line_number, format!("missing value for '{name}'")))?;
                let value = token
                    .parse()
                    .map_err(|_| malformed(line_number, format!("bad number '{token}'")))?;
                values.push(value);
            }
            Property::List(name) => {
                let count: usize = tokens
                    .next()
                    .and_then(|token| token.parse().ok())
                    .ok_or_else(|| malformed(line_number, format!("bad list length for '{name}'")))?;
                for _ in 0..count {
                    tokens.next();
                }
                values.push(0.0);
            }
        }
    }
    Ok(values)
}

fn read_faces<'a, I>(element: &Element, body: &mut I, vertex_count: usize) -> Result<Vec<[u32; 3]>, PlyError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let list = element
        .list_index()
        .ok_or(PlyError::MissingProperty("vertex_indices"))?;

    let mut triangles = Vec::new();
    for face in 0..element.count {
        let (line_number, line) = next_line(body)?;
        let mut tokens = line.split_whitespace();
        // Scalars before the index list are skipped
        for _ in 0..list {
            tokens.next();
        }
        let count: usize = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| malformed(line_number, "bad face index count"))?;
        let indices = tokens
            .take(count)
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| malformed(line_number, format!("bad vertex index '{token}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if indices.len() != count || count < 3 {
            return Err(malformed(line_number, "face needs at least three indices"));
        }
        if let Some(&index) = indices.iter().find(|&&index| index >= vertex_count) {
            return Err(PlyError::IndexOutOfRange {
                face,
                index,
                count: vertex_count,
            });
        }
        // Fan triangulation
        for pair in indices[1..].windows(2) {
            triangles.push([indices[0] as u32, pair[0] as u32, pair[1] as u32]);
        }
    }
    Ok(triangles)
}

fn next_line<'a, I>(body: &mut I) -> Result<(usize, &'a str), PlyError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    body.next().ok_or(PlyError::Malformed {
        line: 0,
        reason: "unexpected end of file".to_string(),
    })
}

fn malformed(line: usize, reason: impl Into<String>) -> PlyError {
    PlyError::Malformed {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SQUARE: &str = "ply
format ascii 1.0
comment unit square
element vertex 4
property float x
property float y
property float z
property uchar red
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255
1 0 0 255
1 1 0 255
0 1 0 255
4 0 1 2 3
";

    #[test]
    fn quad_is_fan_triangulated() {
        let mesh = parse_ply(SQUARE).unwrap().mesh;
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.positions[2], Vec3::new(1.0, 1.0, 0.0));
        assert!(mesh.uvs.is_empty());
    }

    #[test]
    fn huge_vertex_count_is_reported() {
        let text = SQUARE.replace("element vertex 4", "element vertex 18446744073709551615");
        assert!(matches!(parse_ply(&text), Err(PlyError::Malformed { .. })));
    }

    #[test]
    fn vertex_colors_average_into_a_flat_color() {
        let text = SQUARE
            .replace("property uchar red", "property uchar red\nproperty uchar green\nproperty uchar blue")
            .replace("0 0 0 255\n", "0 0 0 255 0 0\n")
            .replace("1 0 0 255\n", "1 0 0 255 0 0\n")
            .replace("1 1 0 255\n", "1 1 0 255 255 0\n")
            .replace("0 1 0 255\n", "0 1 0 255 255 0\n");
        let color = parse_ply(&text).unwrap().color.unwrap();
        assert_abs_diff_eq!(color[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(color[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(color[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn partial_colors_are_ignored() {
        assert_eq!(parse_ply(SQUARE).unwrap().color, None);
    }

    #[test]
    fn texture_coordinates_are_read() {
        let text = SQUARE
            .replace("property uchar red", "property float s\nproperty float t")
            .replace("0 0 0 255\n", "0 0 0 0 0\n")
            .replace("1 0 0 255\n", "1 0 0 1 0\n")
            .replace("1 1 0 255\n", "1 1 0 1 1\n")
            .replace("0 1 0 255\n", "0 1 0 0 1\n");
        let mesh = parse_ply(&text).unwrap().mesh;
        assert_eq!(mesh.uvs, vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]);
    }

    #[test]
    fn binary_format_is_reported() {
        let text = SQUARE.replace("format ascii 1.0", "format binary_little_endian 1.0");
        assert!(matches!(parse_ply(&text), Err(PlyError::UnsupportedFormat(_))));
    }

    #[test]
    fn missing_magic_is_reported() {
        assert!(matches!(parse_ply("solid cube\n"), Err(PlyError::MissingMagic)));
    }

    #[test]
    fn truncated_body_is_reported() {
        let text: String = SQUARE.lines().take(14).map(|line| format!("{line}\n")).collect();
        assert!(matches!(parse_ply(&text), Err(PlyError::Malformed { .. })));
    }

    #[test]
    fn bad_number_reports_line() {
        let text = SQUARE.replace("1 1 0 255", "1 one 0 255");
        match parse_ply(&text) {
            Err(PlyError::Malformed { line, .. }) => assert_eq!(line, 14),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let text = SQUARE.replace("4 0 1 2 3", "3 0 1 7");
        assert!(matches!(
            parse_ply(&text),
            Err(PlyError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("virtual_ambient_missing_model.ply");
        assert!(matches!(read_ply_file(&path), Err(PlyError::Io(_))));
    }
}
