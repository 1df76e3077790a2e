use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One labelled submission, as found in the per-language label files.
#[derive(Debug, Deserialize)]
struct LabelLine {
    problem: String,
    #[serde(default)]
    tags: Vec<String>,
    complexity: Option<String>,
}

/// Per-problem metadata aggregated over every labelled submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemMeta {
    pub problem_id: String,
    pub tags: Vec<String>,
    pub total_examples: u32,
    pub complexity_counts: BTreeMap<String, u32>,
}

/// Folds label lines into [`ProblemMeta`] records, first-seen order.
#[derive(Debug, Default)]
pub struct Merger {
    problems: Vec<ProblemMeta>,
    index: HashMap<String, usize>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every non-blank line of `content`; `source` names it in errors.
    pub fn add_lines(&mut self, source: &str, content: &str) -> Result<usize> {
        let mut added = 0;
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let label: LabelLine = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: malformed label line", source, n + 1))?;
            self.add(label);
            added += 1;
        }
        Ok(added)
    }

    fn add(&mut self, label: LabelLine) {
        let idx = match self.index.get(&label.problem) {
            Some(&idx) => idx,
            None => {
                // tags come from the first submission seen for the problem
                self.problems.push(ProblemMeta {
                    problem_id: label.problem.clone(),
                    tags: label.tags,
                    total_examples: 0,
                    complexity_counts: BTreeMap::new(),
                });
                self.index.insert(label.problem, self.problems.len() - 1);
                self.problems.len() - 1
            }
        };
        let meta = &mut self.problems[idx];
        meta.total_examples += 1;
        if let Some(c) = label.complexity.filter(|c| !c.is_empty()) {
            *meta.complexity_counts.entry(c).or_insert(0) += 1;
        }
    }

    pub fn finish(self) -> Vec<ProblemMeta> {
        self.problems
    }
}

/// Merge label files into one JSON-lines file of [`ProblemMeta`].
pub fn merge_files(inputs: &[impl AsRef<Path>], output: &Path) -> Result<usize> {
    let mut merger = Merger::new();
    for input in inputs {
        let input = input.as_ref();
        let content = fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let n = merger.add_lines(&input.display().to_string(), &content)?;
        info!("Read {} labelled submissions from {}", n, input.display());
    }
    let problems = merger.finish();

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);
    for meta in &problems {
        serde_json::to_writer(&mut out, meta)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(problems.len())
}

/// Read a JSON-lines file of [`ProblemMeta`].
pub fn read_meta(path: &Path) -> Result<Vec<ProblemMeta>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(n, l)| {
            serde_json::from_str(l)
                .with_context(|| format!("{}:{}: malformed problem line", path.display(), n + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAVA: &str = r#"{"problem": "1850_a", "tags": ["math"], "complexity": "O(n)"}
{"problem": "1850_b", "tags": ["greedy", "sortings"], "complexity": null}

{"problem": "1850_a", "tags": ["math"], "complexity": "O(n)", "source": "java"}
"#;
    const PYTHON: &str = r#"{"problem": "1850_a", "tags": ["ignored"], "complexity": "O(n log n)"}
{"problem": "1851_c", "tags": [], "complexity": "O(1)"}
"#;

    #[test]
    fn aggregates_across_sources() {
        let mut m = Merger::new();
        assert_eq!(m.add_lines("java", JAVA).unwrap(), 3);
        assert_eq!(m.add_lines("python", PYTHON).unwrap(), 2);
        let p = m.finish();

        let ids: Vec<&str> = p.iter().map(|x| x.problem_id.as_str()).collect();
        assert_eq!(ids, ["1850_a", "1850_b", "1851_c"]);

        assert_eq!(p[0].tags, vec!["math"]);
        assert_eq!(p[0].total_examples, 3);
        assert_eq!(p[0].complexity_counts["O(n)"], 2);
        assert_eq!(p[0].complexity_counts["O(n log n)"], 1);

        assert_eq!(p[1].total_examples, 1);
        assert!(p[1].complexity_counts.is_empty());
    }

    #[test]
    fn malformed_line_names_its_location() {
        let mut m = Merger::new();
        let err = m.add_lines("labels.jsonl", "{\"problem\": \"1_a\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("labels.jsonl:2"), "{err}");
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("cf_features_merge_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let java = dir.join("java.jsonl");
        let python = dir.join("python.jsonl");
        fs::write(&java, JAVA).unwrap();
        fs::write(&python, PYTHON).unwrap();

        let out = dir.join("out/data.jsonl");
        assert_eq!(merge_files(&[&java, &python], &out).unwrap(), 3);
        let back = read_meta(&out).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[2].problem_id, "1851_c");

        fs::remove_dir_all(&dir).unwrap();
    }
}
