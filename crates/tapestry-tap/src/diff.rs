//! Line diff between expected and actual values.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Expected(&'a str),
    Actual(&'a str),
}

/// LCS tables larger than this fall back to listing both sides whole.
pub const MAX_TABLE_CELLS: usize = 1 << 20;

/// Longest-common-subsequence diff over lines. Expected-only lines come
/// before actual-only lines within each changed hunk.
///
/// The common prefix and suffix are matched first, so only the changed
/// middle needs a table.
pub fn line_diff<'a>(expected: &'a str, actual: &'a str) -> Vec<DiffLine<'a>> {
    let left: Vec<&str> = expected.lines().collect();
    let right: Vec<&str> = actual.lines().collect();

    let prefix = left
        .iter()
        .zip(&right)
        .take_while(|(l, r)| l == r)
        .count();
    let suffix = left[prefix..]
        .iter()
        .rev()
        .zip(right[prefix..].iter().rev())
        .take_while(|(l, r)| l == r)
        .count();
    let left_mid = &left[prefix..left.len() - suffix];
    let right_mid = &right[prefix..right.len() - suffix];

    let mut out = Vec::with_capacity(left.len() + right.len());
    out.extend(left[..prefix].iter().map(|l| DiffLine::Same(*l)));
    let cells = (left_mid.len() + 1).saturating_mul(right_mid.len() + 1);
    if cells > MAX_TABLE_CELLS {
        out.extend(left_mid.iter().map(|l| DiffLine::Expected(*l)));
        out.extend(right_mid.iter().map(|l| DiffLine::Actual(*l)));
    } else {
        middle_diff(left_mid, right_mid, &mut out);
    }
    out.extend(left[left.len() - suffix..].iter().map(|l| DiffLine::Same(*l)));
    out
}

fn middle_diff<'a>(left: &[&'a str], right: &[&'a str], out: &mut Vec<DiffLine<'a>>) {
    let (n, m) = (left.len(), right.len());
    let width = m + 1;

    // lcs[i * width + j] = LCS length of left[i..] and right[j..]
    let mut lcs = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if left[i] == right[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            out.push(DiffLine::Same(left[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            out.push(DiffLine::Expected(left[i]));
            i += 1;
        } else {
            out.push(DiffLine::Actual(right[j]));
            j += 1;
        }
    }
    out.extend(left[i..].iter().map(|l| DiffLine::Expected(*l)));
    out.extend(right[j..].iter().map(|l| DiffLine::Actual(*l)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_change() {
        assert_eq!(
            line_diff("alice", "bob"),
            vec![DiffLine::Expected("alice"), DiffLine::Actual("bob")]
        );
    }

    #[test]
    fn test_common_lines_kept() {
        let diff = line_diff("[\n  1,\n  2,\n]", "[\n  1,\n  3,\n]");
        assert_eq!(
            diff,
            vec![
                DiffLine::Same("["),
                DiffLine::Same("  1,"),
                DiffLine::Expected("  2,"),
                DiffLine::Actual("  3,"),
                DiffLine::Same("]"),
            ]
        );
    }

    #[test]
    fn test_identical_has_no_changes() {
        assert!(line_diff("a\nb", "a\nb")
            .iter()
            .all(|l| matches!(l, DiffLine::Same(_))));
    }

    #[test]
    fn test_large_inputs_trim_common_ends() {
        let expected: String = (0..20_000).map(|i| format!("    {i},\n")).collect();
        let actual = expected.replacen("    10000,", "    -1,", 1);
        let diff = line_diff(&expected, &actual);
        let changed: Vec<&DiffLine> = diff
            .iter()
            .filter(|l| !matches!(l, DiffLine::Same(_)))
            .collect();
        assert_eq!(
            changed,
            vec![&DiffLine::Expected("    10000,"), &DiffLine::Actual("    -1,")]
        );
        assert_eq!(diff.len(), 20_001);
    }

    #[test]
    fn test_large_unrelated_inputs_listed_whole() {
        let expected: String = (0..2_000).map(|i| format!("e{i}\n")).collect();
        let actual: String = (0..2_000).map(|i| format!("a{i}\n")).collect();
        let diff = line_diff(&expected, &actual);
        assert_eq!(diff.len(), 4_000);
        assert_eq!(diff[0], DiffLine::Expected("e0"));
        assert_eq!(diff[2_000], DiffLine::Actual("a0"));
    }
}
