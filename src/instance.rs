//! Module for parsing and representing Max-SC-QBF instances.
//!
//! An instance file is plain text with fixed line positions:
//!
//! ```text
//! n
//! |S_1| |S_2| ... |S_n|
//! elements of S_1
//! ...
//! elements of S_n
//! c_11 c_12 ... c_1n
//! c_22 ... c_2n
//! ...
//! c_nn
//! ```
//!
//! Subset elements are 1-indexed members of the universe `{1..n}`. Each
//! coefficient row `i` only lists the upper-triangular part (columns `i..n`),
//! the parser left-pads it with zeros to a full row.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or constructing an instance.
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("cannot read instance file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed instance: empty input, expected the variable count on line 1")]
    Empty,
    #[error("malformed instance: expected at least {expected} lines for n = {n}, found {found}")]
    TooShort { n: usize, expected: usize, found: usize },
    #[error("malformed instance: line {line}: expected {kind}, found {token:?}")]
    InvalidToken {
        line: usize,
        token: String,
        kind: &'static str,
    },
    #[error("malformed instance: line {line}: subset element {value} outside universe [1, {n}]")]
    ElementOutOfRange { line: usize, value: i64, n: usize },
    #[error("malformed instance: line {line}: expected {expected} tokens, found {found}")]
    WrongTokenCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("malformed instance: line {line}: unexpected content after the last coefficient row")]
    TrailingContent { line: usize },
    #[error("malformed instance: {0}")]
    Shape(String),
}

/// A Max-SC-QBF instance: an upper-triangular coefficient matrix and one
/// covering subset per decision variable.
///
/// Instances are immutable once built. Both constructors validate the data,
/// so every `Instance` value satisfies:
/// - the matrix is `n x n` with finite entries and zeros below the diagonal;
/// - there are exactly `n` subsets, all drawn from `{1..n}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    coefficients_matrix: Vec<Vec<f64>>,
    variable_subsets: Vec<BTreeSet<usize>>,
}

impl Instance {
    /// Build an instance from already materialized data.
    pub fn new(
        coefficients_matrix: Vec<Vec<f64>>,
        variable_subsets: Vec<BTreeSet<usize>>,
    ) -> Result<Self, InstanceError> {
        let n = variable_subsets.len();

        if coefficients_matrix.len() != n {
            return Err(InstanceError::Shape(format!(
                "{} subsets but {} coefficient rows",
                n,
                coefficients_matrix.len()
            )));
        }

        for (i, row) in coefficients_matrix.iter().enumerate() {
            if row.len() != n {
                return Err(InstanceError::Shape(format!(
                    "coefficient row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(InstanceError::Shape(format!(
                        "coefficient ({}, {}) is not finite",
                        i, j
                    )));
                }
                if j < i && value != 0.0 {
                    return Err(InstanceError::Shape(format!(
                        "coefficient ({}, {}) lies below the diagonal but is {}",
                        i, j, value
                    )));
                }
            }
        }

        for (i, subset) in variable_subsets.iter().enumerate() {
            if let Some(&element) = subset.iter().find(|&&e| e == 0 || e > n) {
                return Err(InstanceError::Shape(format!(
                    "subset {} contains element {} outside universe [1, {}]",
                    i + 1,
                    element,
                    n
                )));
            }
        }

        Ok(Instance {
            coefficients_matrix,
            variable_subsets,
        })
    }

    /// Parse an instance from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse an instance from its text representation.
    pub fn parse(text: &str) -> Result<Self, InstanceError> {
        let lines: Vec<&str> = text.lines().collect();

        let header = lines.first().ok_or(InstanceError::Empty)?;
        let n: usize = parse_token(header.trim(), 1, "variable count")?;

        let expected = n.saturating_mul(2).saturating_add(2);
        if lines.len() < expected {
            return Err(InstanceError::TooShort {
                n,
                expected,
                found: lines.len(),
            });
        }

        // Declared subset sizes only tell how many tokens each subset line carries
        let sizes: Vec<usize> = tokens_exact(lines[1], 2, n)?
            .into_iter()
            .map(|token| parse_token(token, 2, "subset size"))
            .collect::<Result<_, _>>()?;

        let mut variable_subsets = Vec::with_capacity(n);
        for (i, &size) in sizes.iter().enumerate() {
            let line_no = i + 3;
            let mut subset = BTreeSet::new();
            for token in tokens_exact(lines[i + 2], line_no, size)? {
                let value: i64 = parse_token(token, line_no, "integer subset element")?;
                if value < 1 || value > n as i64 {
                    return Err(InstanceError::ElementOutOfRange {
                        line: line_no,
                        value,
                        n,
                    });
                }
                subset.insert(value as usize);
            }
            variable_subsets.push(subset);
        }

        let mut coefficients_matrix = Vec::with_capacity(n);
        for i in 0..n {
            let line_no = n + i + 3;
            let mut row = vec![0.0; i];
            row.reserve(n - i);
            for token in tokens_exact(lines[n + i + 2], line_no, n - i)? {
                let value: f64 = parse_token(token, line_no, "real coefficient")?;
                if !value.is_finite() {
                    return Err(InstanceError::InvalidToken {
                        line: line_no,
                        token: token.to_string(),
                        kind: "finite real coefficient",
                    });
                }
                row.push(value);
            }
            coefficients_matrix.push(row);
        }

        if let Some(offset) = lines[expected..].iter().position(|l| !l.trim().is_empty()) {
            return Err(InstanceError::TrailingContent {
                line: expected + offset + 1,
            });
        }

        log::debug!("Parsed instance with {} variables", n);

        Ok(Instance {
            coefficients_matrix,
            variable_subsets,
        })
    }

    /// Serialize back to the text format accepted by [`Instance::parse`].
    pub fn to_text(&self) -> String {
        let n = self.size();
        let mut out = String::new();

        out.push_str(&n.to_string());
        out.push('\n');

        let sizes: Vec<String> = self
            .variable_subsets
            .iter()
            .map(|s| s.len().to_string())
            .collect();
        out.push_str(&sizes.join(" "));
        out.push('\n');

        for subset in &self.variable_subsets {
            let elements: Vec<String> = subset.iter().map(|e| e.to_string()).collect();
            out.push_str(&elements.join(" "));
            out.push('\n');
        }

        for (i, row) in self.coefficients_matrix.iter().enumerate() {
            let upper: Vec<String> = row[i..].iter().map(|c| c.to_string()).collect();
            out.push_str(&upper.join(" "));
            out.push('\n');
        }

        out
    }

    /// Write the instance to a file in the text format.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        fs::write(path, self.to_text())
    }

    /// Number of decision variables, which is also the universe size.
    #[inline]
    pub fn size(&self) -> usize {
        self.variable_subsets.len()
    }

    #[inline]
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        self.coefficients_matrix[i][j]
    }

    pub fn coefficients_matrix(&self) -> &[Vec<f64>] {
        &self.coefficients_matrix
    }

    pub fn variable_subsets(&self) -> &[BTreeSet<usize>] {
        &self.variable_subsets
    }

    /// Covering subset of variable `i` (0-indexed variable, 1-indexed elements).
    pub fn subset(&self, i: usize) -> &BTreeSet<usize> {
        &self.variable_subsets[i]
    }

    /// Universe elements that no subset contains.
    pub fn uncovered_elements(&self) -> Vec<usize> {
        let mut covered = vec![false; self.size() + 1];
        for subset in &self.variable_subsets {
            for &element in subset {
                covered[element] = true;
            }
        }
        (1..=self.size()).filter(|&k| !covered[k]).collect()
    }

    /// Whether selecting every variable covers the universe.
    pub fn covers_universe(&self) -> bool {
        self.uncovered_elements().is_empty()
    }

    /// Whether the union of the selected subsets is the whole universe.
    pub fn selection_covers(&self, selection: &[bool]) -> bool {
        let mut covered = vec![false; self.size() + 1];
        for (subset, _) in self
            .variable_subsets
            .iter()
            .zip(selection)
            .filter(|&(_, &chosen)| chosen)
        {
            for &element in subset {
                covered[element] = true;
            }
        }
        covered.iter().skip(1).all(|&c| c)
    }

    /// Direct quadratic evaluation `sum_i sum_j s_i * s_j * c_ij`.
    ///
    /// Variables past the end of `selection` count as unselected.
    pub fn quadratic_value(&self, selection: &[bool]) -> f64 {
        let chosen = |i: usize| selection.get(i).copied().unwrap_or(false);
        let mut value = 0.0;
        for (i, row) in self.coefficients_matrix.iter().enumerate() {
            if !chosen(i) {
                continue;
            }
            for (j, &c) in row.iter().enumerate() {
                if chosen(j) {
                    value += c;
                }
            }
        }
        value
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.size();
        let total_elements: usize = self.variable_subsets.iter().map(|s| s.len()).sum();

        let upper: Vec<f64> = self
            .coefficients_matrix
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row[i..].iter().copied())
            .collect();
        let nonzero_coefficients = upper.iter().filter(|&&c| c != 0.0).count();

        InstanceStatistics {
            num_variables: n,
            total_subset_elements: total_elements,
            avg_subset_size: if n > 0 { total_elements as f64 / n as f64 } else { 0.0 },
            nonzero_coefficients,
            coefficient_density: if upper.is_empty() {
                0.0
            } else {
                nonzero_coefficients as f64 / upper.len() as f64
            },
            min_coefficient: if upper.is_empty() {
                0.0
            } else {
                upper.iter().copied().fold(f64::INFINITY, f64::min)
            },
            max_coefficient: if upper.is_empty() {
                0.0
            } else {
                upper.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            },
            uncovered_elements: self.uncovered_elements().len(),
        }
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance(")?;
        writeln!(f, "  coefficients_matrix:")?;
        for row in &self.coefficients_matrix {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        writeln!(f, "  variable_subsets:")?;
        for (i, subset) in self.variable_subsets.iter().enumerate() {
            let elements: Vec<String> = subset.iter().map(|e| e.to_string()).collect();
            writeln!(f, "    subset {}: {}", i + 1, elements.join(" "))?;
        }
        write!(f, ")")
    }
}

/// Statistics about a Max-SC-QBF instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub num_variables: usize,
    pub total_subset_elements: usize,
    pub avg_subset_size: f64,
    pub nonzero_coefficients: usize,
    /// Share of non-zero entries in the upper triangle (diagonal included)
    pub coefficient_density: f64,
    pub min_coefficient: f64,
    pub max_coefficient: f64,
    pub uncovered_elements: usize,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  Variables: {}", self.num_variables)?;
        writeln!(f, "  Avg subset size: {:.2}", self.avg_subset_size)?;
        writeln!(
            f,
            "  Non-zero coefficients: {} (density {:.2}%)",
            self.nonzero_coefficients,
            self.coefficient_density * 100.0
        )?;
        writeln!(
            f,
            "  Coefficient range: [{}, {}]",
            self.min_coefficient, self.max_coefficient
        )?;
        writeln!(f, "  Uncovered elements: {}", self.uncovered_elements)
    }
}

fn tokens_exact(line: &str, line_no: usize, expected: usize) -> Result<Vec<&str>, InstanceError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != expected {
        return Err(InstanceError::WrongTokenCount {
            line: line_no,
            expected,
            found: tokens.len(),
        });
    }
    Ok(tokens)
}

fn parse_token<T: std::str::FromStr>(
    token: &str,
    line_no: usize,
    kind: &'static str,
) -> Result<T, InstanceError> {
    token.parse().map_err(|_| InstanceError::InvalidToken {
        line: line_no,
        token: token.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = "2\n2 2\n1 2\n1 2\n0 5\n0\n";

    fn set(elements: &[usize]) -> BTreeSet<usize> {
        elements.iter().copied().collect()
    }

    #[test]
    fn test_parse_pads_lower_triangle() {
        let instance = Instance::parse(SCENARIO_A).unwrap();

        assert_eq!(instance.size(), 2);
        assert_eq!(instance.coefficients_matrix(), &[vec![0.0, 5.0], vec![0.0, 0.0]]);
        assert_eq!(instance.variable_subsets(), &[set(&[1, 2]), set(&[1, 2])]);
    }

    #[test]
    fn test_parse_three_variables() {
        let text = "3\n2 1 3\n1 3\n2\n3 3 1\n1 -2 0.5\n4 0\n-7\n";
        let instance = Instance::parse(text).unwrap();

        assert_eq!(instance.subset(0), &set(&[1, 3]));
        assert_eq!(instance.subset(2), &set(&[1, 3]));
        assert_eq!(instance.coefficient(0, 2), 0.5);
        assert_eq!(instance.coefficient(1, 0), 0.0);
        assert_eq!(instance.coefficient(1, 1), 4.0);
        assert_eq!(instance.coefficient(2, 2), -7.0);
    }

    #[test]
    fn test_round_trip() {
        let text = "3\n2 1 3\n1 3\n2\n3 3 1\n1 -2 0.5\n4 0\n-7\n";
        let instance = Instance::parse(text).unwrap();
        let reparsed = Instance::parse(&instance.to_text()).unwrap();

        assert_eq!(instance, reparsed);
    }

    #[test]
    fn test_round_trip_empty_subset() {
        let instance = Instance::new(
            vec![vec![1.5, 0.0], vec![0.0, -0.25]],
            vec![set(&[1, 2]), set(&[])],
        )
        .unwrap();
        let reparsed = Instance::parse(&instance.to_text()).unwrap();

        assert_eq!(instance, reparsed);
    }

    #[test]
    fn test_too_short_is_rejected() {
        let err = Instance::parse("2\n2 2\n1 2\n1 2\n0 5\n").unwrap_err();
        assert!(matches!(
            err,
            InstanceError::TooShort { n: 2, expected: 6, found: 5 }
        ));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(Instance::parse(""), Err(InstanceError::Empty)));
    }

    #[test]
    fn test_element_out_of_range() {
        let err = Instance::parse("2\n2 2\n1 3\n1 2\n0 5\n0\n").unwrap_err();
        assert!(matches!(
            err,
            InstanceError::ElementOutOfRange { line: 3, value: 3, n: 2 }
        ));

        let err = Instance::parse("2\n1 2\n0\n1 2\n0 5\n0\n").unwrap_err();
        assert!(matches!(err, InstanceError::ElementOutOfRange { value: 0, .. }));
    }

    #[test]
    fn test_non_numeric_token() {
        let err = Instance::parse("2\n2 2\n1 2\n1 2\n0 x\n0\n").unwrap_err();
        match err {
            InstanceError::InvalidToken { line, token, .. } => {
                assert_eq!(line, 5);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(matches!(
            Instance::parse("two\n"),
            Err(InstanceError::InvalidToken { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_coefficient() {
        let err = Instance::parse("1\n1\n1\nNaN\n").unwrap_err();
        assert!(matches!(err, InstanceError::InvalidToken { line: 4, .. }));
    }

    #[test]
    fn test_wrong_token_count() {
        // row 0 must carry n - 0 = 2 coefficients
        let err = Instance::parse("2\n2 2\n1 2\n1 2\n5\n0\n").unwrap_err();
        assert!(matches!(
            err,
            InstanceError::WrongTokenCount { line: 5, expected: 2, found: 1 }
        ));

        // declared subset size disagrees with the subset line
        let err = Instance::parse("2\n1 2\n1 2\n1 2\n0 5\n0\n").unwrap_err();
        assert!(matches!(
            err,
            InstanceError::WrongTokenCount { line: 3, expected: 1, found: 2 }
        ));
    }

    #[test]
    fn test_trailing_content() {
        assert!(Instance::parse("2\n2 2\n1 2\n1 2\n0 5\n0\n\n\n").is_ok());

        let err = Instance::parse("2\n2 2\n1 2\n1 2\n0 5\n0\n1 2\n").unwrap_err();
        assert!(matches!(err, InstanceError::TrailingContent { line: 7 }));
    }

    #[test]
    fn test_new_rejects_lower_triangle() {
        let err = Instance::new(
            vec![vec![0.0, 5.0], vec![5.0, 0.0]],
            vec![set(&[1]), set(&[2])],
        )
        .unwrap_err();
        assert!(matches!(err, InstanceError::Shape(_)));
    }

    #[test]
    fn test_new_rejects_bad_shape() {
        assert!(Instance::new(vec![vec![0.0]], vec![set(&[1]), set(&[2])]).is_err());
        assert!(Instance::new(vec![vec![0.0]], vec![set(&[2])]).is_err());
    }

    #[test]
    fn test_quadratic_value() {
        let instance = Instance::parse("3\n1 1 1\n1\n2\n3\n1 2 3\n4 5\n6\n").unwrap();

        assert_eq!(instance.quadratic_value(&[false, false, false]), 0.0);
        assert_eq!(instance.quadratic_value(&[true, false, false]), 1.0);
        assert_eq!(instance.quadratic_value(&[true, true, false]), 1.0 + 2.0 + 4.0);
        assert_eq!(instance.quadratic_value(&[true, true, true]), 21.0);

        assert_eq!(instance.quadratic_value(&[true, true]), 1.0 + 2.0 + 4.0);
        assert_eq!(instance.quadratic_value(&[]), 0.0);
        assert!(!instance.selection_covers(&[true, true]));
    }

    #[test]
    fn test_coverage_helpers() {
        let instance = Instance::new(
            vec![vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]],
            vec![set(&[1]), set(&[2]), set(&[])],
        )
        .unwrap();

        assert_eq!(instance.uncovered_elements(), vec![3]);
        assert!(!instance.covers_universe());
        assert!(!instance.selection_covers(&[true, true, true]));

        let covering = Instance::parse(SCENARIO_A).unwrap();
        assert!(covering.selection_covers(&[true, false]));
        assert!(!covering.selection_covers(&[false, false]));
    }

    #[test]
    fn test_statistics() {
        let instance = Instance::parse("3\n2 1 3\n1 3\n2\n3 3 1\n1 -2 0.5\n4 0\n-7\n").unwrap();
        let stats = instance.statistics();

        assert_eq!(stats.num_variables, 3);
        assert_eq!(stats.total_subset_elements, 5);
        assert_eq!(stats.nonzero_coefficients, 5);
        assert_eq!(stats.min_coefficient, -7.0);
        assert_eq!(stats.max_coefficient, 4.0);
        assert_eq!(stats.uncovered_elements, 0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance_0.txt");
        std::fs::write(&path, SCENARIO_A).unwrap();

        let instance = Instance::from_file(&path).unwrap();
        assert_eq!(instance.coefficient(0, 1), 5.0);

        let missing = Instance::from_file(dir.path().join("missing.txt"));
        assert!(matches!(missing, Err(InstanceError::Io(_))));
    }
}
