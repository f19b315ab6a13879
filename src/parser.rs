//! Parsing the loosely-formatted model response into a `Problem`.
//!
//! The generation prompt asks for three fixed section markers. Real model
//! output drifts, so the parser is deliberately forgiving: a missing marker
//! yields an empty field instead of an error, and each marker is located
//! independently of the others. Callers must tolerate an incomplete Problem.

use crate::domain::Problem;

pub const MARKER_PROBLEM: &str = "### Problem:";
pub const MARKER_CODE: &str = "### Solution code:";
pub const MARKER_OUTPUT: &str = "### Solution output:";

const MARKERS: [&str; 3] = [MARKER_PROBLEM, MARKER_CODE, MARKER_OUTPUT];

/// Extract the three sections from raw generator output.
/// Each section runs from its marker to the next marker that is actually
/// present (or end of text), trimmed of surrounding whitespace.
/// No validation of the code section is performed here.
pub fn parse_problem_response(raw: &str) -> Problem {
  Problem {
    description: extract_section(raw, 0),
    reference_code: extract_section(raw, 1),
    reference_output: extract_section(raw, 2),
  }
}

fn extract_section(raw: &str, idx: usize) -> String {
  let marker = MARKERS[idx];
  let Some(pos) = raw.find(marker) else {
    return String::new();
  };
  let start = pos + marker.len();
  let end = MARKERS[idx + 1..]
    .iter()
    .filter_map(|m| raw[start..].find(m).map(|p| start + p))
    .min()
    .unwrap_or(raw.len());
  raw[start..end].trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn well_formed() -> String {
    format!(
      "{MARKER_PROBLEM}\nPrint the numbers 1 to 5.\n\n{MARKER_CODE}\nfor i in range(1, 6):\n    print(i)\n\n{MARKER_OUTPUT}\n1\n2\n3\n4\n5\n"
    )
  }

  #[test]
  fn recovers_all_three_sections_trimmed() {
    let p = parse_problem_response(&well_formed());
    assert_eq!(p.description, "Print the numbers 1 to 5.");
    assert_eq!(p.reference_code, "for i in range(1, 6):\n    print(i)");
    assert_eq!(p.reference_output, "1\n2\n3\n4\n5");
  }

  #[test]
  fn no_marker_tokens_leak_into_fields() {
    let p = parse_problem_response(&well_formed());
    for field in [&p.description, &p.reference_code, &p.reference_output] {
      for m in MARKERS {
        assert!(!field.contains(m), "marker {m:?} leaked into {field:?}");
      }
    }
  }

  #[test]
  fn missing_problem_marker_yields_empty_description() {
    let raw = format!("{MARKER_CODE}\nx = 1\nprint(x)\n\n{MARKER_OUTPUT}\n1");
    let p = parse_problem_response(&raw);
    assert_eq!(p.description, "");
    assert_eq!(p.reference_code, "x = 1\nprint(x)");
    assert_eq!(p.reference_output, "1");
  }

  #[test]
  fn missing_code_marker_leaves_neighbors_intact() {
    let raw = format!("{MARKER_PROBLEM}\nSay hi.\n\n{MARKER_OUTPUT}\nhi");
    let p = parse_problem_response(&raw);
    assert_eq!(p.description, "Say hi.");
    assert_eq!(p.reference_code, "");
    assert_eq!(p.reference_output, "hi");
  }

  #[test]
  fn missing_output_marker_runs_code_to_end_of_text() {
    let raw = format!("{MARKER_PROBLEM}\nSay hi.\n\n{MARKER_CODE}\nprint('hi')");
    let p = parse_problem_response(&raw);
    assert_eq!(p.description, "Say hi.");
    assert_eq!(p.reference_code, "print('hi')");
    assert_eq!(p.reference_output, "");
  }

  #[test]
  fn no_markers_at_all_yields_an_empty_problem() {
    let p = parse_problem_response("The model rambled instead of answering.");
    assert!(p.is_empty());
  }
}
