//! Reader and writer for the LAMMPS-style network data file.
//!
//! The layout is a title line, a header of counts and box bounds, then the
//! `Masses`, `Bond Coeffs`, `Atoms` and `Bonds` sections. Atom type 1 is a
//! mobile particle, 2 the fixed bottom row and 3 the driven top row. The bond
//! type doubles as the bond class used to look up breaking thresholds.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::description::{BondCoefficients, BondRecord, NetworkDescription, ParticleRecord};
use crate::errors::{ConfigError, DataFileError};
use crate::geometry::point;
use crate::network::Group;

/// Section currently being read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    /// Counts and box bounds before the first keyword.
    Header,
    /// Per-type masses, read and ignored.
    Masses,
    /// Stiffness and rest length per bond type.
    BondCoeffs,
    /// Particle id, molecule, type and coordinates.
    Atoms,
    /// Bond id, type and both endpoints.
    Bonds,
    /// Any section this reader skips.
    Other,
}

impl Section {
    /// Recognise a section keyword line.
    fn from_keyword(line: &str) -> Option<Self> {
        match line {
            "Masses" => Some(Self::Masses),
            "Bond Coeffs" => Some(Self::BondCoeffs),
            "Atoms" => Some(Self::Atoms),
            "Bonds" => Some(Self::Bonds),
            "Velocities" | "Pair Coeffs" | "Angle Coeffs" | "Angles" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Map an atom type onto a boundary group.
fn group_for_type(atom_type: u32) -> Option<Group> {
    match atom_type {
        1 => Some(Group::Mobile),
        2 => Some(Group::Fixed),
        3 => Some(Group::Driven),
        _ => None,
    }
}

/// Atom type written for a boundary group.
fn type_for_group(group: Group) -> u32 {
    match group {
        Group::Mobile => 1,
        Group::Fixed => 2,
        Group::Driven => 3,
    }
}

/// Parse a whitespace-separated field.
fn field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    line: usize,
    name: &str,
) -> Result<T, DataFileError> {
    fields
        .get(index)
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| DataFileError::Malformed {
            line,
            message: format!("cannot read {name}"),
        })
}

/// Parse a network data file.
///
/// # Errors
///
/// Returns [`DataFileError`] for unparseable lines, unknown atom types,
/// missing header entries and count mismatches.
pub fn parse_data_file(text: &str) -> Result<NetworkDescription, DataFileError> {
    let mut declared_atoms = None;
    let mut declared_bonds = None;
    let mut x_bounds = None;
    let mut particles = Vec::new();
    let mut bonds = Vec::new();
    let mut coefficients = BTreeMap::new();
    let mut section = Section::Header;

    // The first line is a free-form title.
    for (index, raw) in text.lines().enumerate().skip(1) {
        let number = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if let Some(next) = Section::from_keyword(line) {
            section = next;
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match section {
            Section::Header => match fields.as_slice() {
                [_, "atoms"] => {
                    declared_atoms = Some(field::<usize>(&fields, 0, number, "atom count")?);
                }
                [_, "bonds"] => {
                    declared_bonds = Some(field::<usize>(&fields, 0, number, "bond count")?);
                }
                [_, _, "xlo", "xhi"] => {
                    let low = field::<f64>(&fields, 0, number, "xlo")?;
                    let high = field::<f64>(&fields, 1, number, "xhi")?;
                    x_bounds = Some((low, high));
                }
                _ => {}
            },
            Section::BondCoeffs => {
                let class = field::<u32>(&fields, 0, number, "bond type")?;
                let stiffness = field::<f64>(&fields, 1, number, "stiffness")?;
                let rest_length = match fields.get(2) {
                    Some(_) => Some(field::<f64>(&fields, 2, number, "rest length")?),
                    None => None,
                };
                coefficients.insert(
                    class,
                    BondCoefficients {
                        stiffness,
                        rest_length,
                    },
                );
            }
            Section::Atoms => {
                // id molecule-id type x y z
                let tag = field::<u64>(&fields, 0, number, "atom id")?;
                let atom_type = field::<u32>(&fields, 2, number, "atom type")?;
                let x = field::<f64>(&fields, 3, number, "x")?;
                let y = field::<f64>(&fields, 4, number, "y")?;
                let group = group_for_type(atom_type).ok_or_else(|| DataFileError::Malformed {
                    line: number,
                    message: format!("unknown atom type {atom_type}"),
                })?;
                particles.push(ParticleRecord {
                    tag,
                    group,
                    position: point(x, y),
                });
            }
            Section::Bonds => {
                // id type p1 p2
                bonds.push(BondRecord {
                    tag: field(&fields, 0, number, "bond id")?,
                    class: field(&fields, 1, number, "bond type")?,
                    start: field(&fields, 2, number, "first atom")?,
                    end: field(&fields, 3, number, "second atom")?,
                });
            }
            Section::Masses | Section::Other => {}
        }
    }

    let (low, high) = x_bounds.ok_or(DataFileError::Missing("xlo xhi bounds"))?;
    let declared_atoms = declared_atoms.ok_or(DataFileError::Missing("atom count"))?;
    let declared_bonds = declared_bonds.ok_or(DataFileError::Missing("bond count"))?;
    if particles.len() != declared_atoms {
        return Err(DataFileError::CountMismatch {
            what: "atoms",
            declared: declared_atoms,
            found: particles.len(),
        });
    }
    if bonds.len() != declared_bonds {
        return Err(DataFileError::CountMismatch {
            what: "bonds",
            declared: declared_bonds,
            found: bonds.len(),
        });
    }
    Ok(NetworkDescription {
        period: high - low,
        particles,
        bonds,
        coefficients,
    })
}

/// Read and parse a network data file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::DataFile`] when it is malformed.
pub fn read_data_file(path: &Path) -> Result<NetworkDescription, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let description = parse_data_file(&text)?;
    tracing::info!(
        path = %path.display(),
        particles = description.particles.len(),
        bonds = description.bonds.len(),
        "read network description"
    );
    Ok(description)
}

/// Render a description in the data file format.
///
/// The X bounds are centred on the particles so that `xhi - xlo` equals the
/// period; the Y bounds get a unit margin.
#[must_use]
pub fn render_data_file(description: &NetworkDescription, title: &str) -> String {
    let mut output = String::new();
    let (x_low, x_high, y_low, y_high) = description.particles.iter().fold(
        (
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ),
        |(x_low, x_high, y_low, y_high), particle| {
            (
                x_low.min(particle.position.x),
                x_high.max(particle.position.x),
                y_low.min(particle.position.y),
                y_high.max(particle.position.y),
            )
        },
    );
    let x_margin = 0.5 * (description.period - (x_high - x_low));
    let bond_types = description
        .bonds
        .iter()
        .map(|bond| bond.class)
        .max()
        .unwrap_or(0);

    let mut line = |text: String| {
        writeln!(&mut output, "{text}").expect("writing to string cannot fail");
    };
    line(title.to_owned());
    line(String::new());
    line(format!("{} atoms", description.particles.len()));
    line(format!("{} bonds", description.bonds.len()));
    line(String::new());
    line("3 atom types".to_owned());
    line(format!("{bond_types} bond types"));
    line(String::new());
    line(format!("{:.6} {:.6} xlo xhi", x_low - x_margin, x_high + x_margin));
    line(format!("{:.6} {:.6} ylo yhi", y_low - 1.0, y_high + 1.0));
    line(format!("{:.6} {:.6} zlo zhi", -1.0, 1.0));
    line(String::new());
    line("Masses".to_owned());
    line(String::new());
    for atom_type in 1..=3 {
        line(format!("{atom_type} 1.0"));
    }
    line(String::new());
    if !description.coefficients.is_empty() {
        line("Bond Coeffs".to_owned());
        line(String::new());
        for (class, coefficients) in &description.coefficients {
            match coefficients.rest_length {
                Some(rest_length) => {
                    line(format!("{class} {} {rest_length}", coefficients.stiffness));
                }
                None => line(format!("{class} {}", coefficients.stiffness)),
            }
        }
        line(String::new());
    }
    line("Atoms # id molecule-id type x y z".to_owned());
    line(String::new());
    for particle in &description.particles {
        line(format!(
            "{} 1 {} {:.6} {:.6} 0.0",
            particle.tag,
            type_for_group(particle.group),
            particle.position.x,
            particle.position.y
        ));
    }
    line(String::new());
    line("Bonds # id type p1 p2".to_owned());
    line(String::new());
    for bond in &description.bonds {
        line(format!("{} {} {} {}", bond.tag, bond.class, bond.start, bond.end));
    }
    output
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const SAMPLE: &str = "\
LAMMPS data file for spring network (N=2)

4 atoms
3 bonds

3 atom types
3 bond types

-0.5 1.5 xlo xhi
-1.0 2.0 ylo yhi
-1.0 1.0 zlo zhi

Masses

1 1.0
2 1.0
3 1.0

Bond Coeffs

1 1.0 1.0
2 1.0 1.0
3 2.0

Atoms # id molecule-id type x y z

1 1 2 0.000000 0.000000 0.0
2 1 2 1.000000 0.000000 0.0
3 1 3 0.500000 0.866025 0.0
4 1 1 1.500000 0.866025 0.0

Bonds # id type p1 p2

1 1 1 2
2 2 1 3
3 3 2 3
";

    #[test]
    fn parses_generated_layout() {
        let description = parse_data_file(SAMPLE).expect("sample parses");
        assert_relative_eq!(description.period, 2.0);
        assert_eq!(description.particles.len(), 4);
        assert_eq!(description.particles[0].group, Group::Fixed);
        assert_eq!(description.particles[2].group, Group::Driven);
        assert_eq!(description.particles[3].group, Group::Mobile);
        assert_eq!(description.bonds[2].class, 3);
        assert_eq!(description.coefficients[&2].rest_length, Some(1.0));
        assert_eq!(description.coefficients[&3].rest_length, None);
        assert_relative_eq!(description.coefficients[&3].stiffness, 2.0);
    }

    #[test]
    fn count_mismatch_is_reported() {
        let truncated = SAMPLE.replace("3 3 2 3\n", "");
        let error = parse_data_file(&truncated).expect_err("missing bond detected");
        assert_eq!(
            error,
            DataFileError::CountMismatch {
                what: "bonds",
                declared: 3,
                found: 2
            }
        );
    }

    #[test]
    fn unknown_atom_type_is_rejected() {
        let broken = SAMPLE.replace("4 1 1 1.500000", "4 1 7 1.500000");
        let error = parse_data_file(&broken).expect_err("bad type detected");
        assert!(matches!(error, DataFileError::Malformed { line: 30, .. }));
    }

    #[test]
    fn missing_bounds_are_reported() {
        let broken = SAMPLE.replace("-0.5 1.5 xlo xhi\n", "");
        let error = parse_data_file(&broken).expect_err("bounds required");
        assert_eq!(error, DataFileError::Missing("xlo xhi bounds"));
    }

    #[test]
    fn rendered_file_parses_back() {
        let description = parse_data_file(SAMPLE).expect("sample parses");
        let text = render_data_file(&description, "round trip");
        let reparsed = parse_data_file(&text).expect("rendered file parses");
        assert_eq!(reparsed.particles, description.particles);
        assert_eq!(reparsed.bonds, description.bonds);
        assert_eq!(reparsed.coefficients, description.coefficients);
        assert_relative_eq!(reparsed.period, description.period, epsilon = 1.0e-9);
    }
}
