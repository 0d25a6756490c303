//! Ranked candidates and the resumable ranking file.
//!
//! A search ranks every feasible candidate it evaluated. The ranking is
//! written to a tab-separated file, one row per candidate:
//!
//! ```text
//! 0110  1  1  switch:-1:1  cpu:0:2  ...  1500000000,1200000000  700000000
//! ```
//!
//! Columns are the pattern bit string, the adopted flag, the attempted
//! flag, one `substrate:device:replicas` column per module, the per-chain
//! rates, and the objective. When a downstream acceptance check rejects
//! the adopted candidate, [`resume`] moves on to the next row that has not
//! been attempted yet and persists the new flags.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use chainplace_core::{RateBounds, Substrate};

use crate::error::RankingError;
use crate::layout::Assignment;
use crate::optimizer::marginal_rate;
use crate::pattern::Pattern;

/// One evaluated placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub pattern: Pattern,
    pub assignments: Vec<Assignment>,
    /// Achieved rate per chain, bits per second.
    pub rates: Vec<f64>,
    /// Sum of marginal rates.
    pub objective: f64,
}

impl Candidate {
    pub fn new(pattern: Pattern, assignments: Vec<Assignment>, rates: Vec<f64>, bounds: &[RateBounds]) -> Self {
        let objective = marginal_rate(bounds, &rates).iter().sum();
        Self {
            pattern,
            assignments,
            rates,
            objective,
        }
    }

    /// Cores consumed by CPU-resident modules, counting each replica.
    pub fn cpu_replicas(&self) -> u32 {
        self.assignments
            .iter()
            .filter(|a| a.substrate.is_cpu())
            .map(|a| a.replicas)
            .sum()
    }
}

/// Candidates in preference order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    candidates: Vec<Candidate>,
}

impl Ranking {
    /// Highest objective first; equal objectives keep evaluation order.
    pub fn by_objective(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| b.objective.total_cmp(&a.objective));
        Self { candidates }
    }

    /// Keep the caller's order.
    pub fn ordered(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Write the ranking with the best candidate adopted.
    pub fn persist(&self, path: &Path) -> Result<(), RankingError> {
        RankingFile::from_ranking(self).save(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub candidate: Candidate,
    pub adopted: bool,
    pub attempted: bool,
}

/// In-memory form of the ranking file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingFile {
    rows: Vec<RankingRow>,
}

/// Result of asking for the next candidate after a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    Adopted(Candidate),
    /// Every row has been attempted.
    Exhausted,
}

impl RankingFile {
    /// The first row starts out adopted and attempted.
    pub fn from_ranking(ranking: &Ranking) -> Self {
        let rows = ranking
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| RankingRow {
                candidate: c.clone(),
                adopted: i == 0,
                attempted: i == 0,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[RankingRow] {
        &self.rows
    }

    pub fn adopted(&self) -> Option<&Candidate> {
        self.rows.iter().find(|r| r.adopted).map(|r| &r.candidate)
    }

    /// Reject the adopted row and adopt the next unattempted one.
    ///
    /// Rows sharing the rejected row's pattern are marked attempted too.
    pub fn advance(&mut self) -> Option<&Candidate> {
        let rejected: Vec<Pattern> = self
            .rows
            .iter()
            .filter(|r| r.adopted)
            .map(|r| r.candidate.pattern.clone())
            .collect();
        for row in &mut self.rows {
            row.adopted = false;
            if rejected.contains(&row.candidate.pattern) {
                row.attempted = true;
            }
        }

        let next = self.rows.iter_mut().find(|r| !r.attempted)?;
        next.adopted = true;
        next.attempted = true;
        Some(&next.candidate)
    }

    pub fn parse(content: &str) -> Result<Self, RankingError> {
        let rows = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| parse_row(l, i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let c = &row.candidate;
            let _ = write!(out, "{}\t{}\t{}", c.pattern, u8::from(row.adopted), u8::from(row.attempted));
            for a in &c.assignments {
                let device = a.device.map_or(-1, |d| d as i64);
                let _ = write!(out, "\t{}:{}:{}", a.substrate.label(), device, a.replicas);
            }
            let rates: Vec<String> = c.rates.iter().map(f64::to_string).collect();
            let _ = writeln!(out, "\t{}\t{}", rates.join(","), c.objective);
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self, RankingError> {
        if !path.exists() {
            return Err(RankingError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| RankingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Replace the file atomically: write a sibling temp file, then rename.
    pub fn save(&self, path: &Path) -> Result<(), RankingError> {
        let io = |source: std::io::Error| RankingError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, self.render()).map_err(io)?;
        std::fs::rename(&tmp, path).map_err(io)?;
        debug!(path = %path.display(), rows = self.rows.len(), "ranking file written");
        Ok(())
    }
}

/// Load the ranking file, advance past the rejected candidate, and
/// persist the updated flags.
pub fn resume(path: &Path) -> Result<ResumeOutcome, RankingError> {
    advance_and_save(RankingFile::load(path)?, path)
}

pub(crate) fn advance_and_save(mut file: RankingFile, path: &Path) -> Result<ResumeOutcome, RankingError> {
    let outcome = match file.advance() {
        Some(candidate) => ResumeOutcome::Adopted(candidate.clone()),
        None => ResumeOutcome::Exhausted,
    };
    file.save(path)?;
    match &outcome {
        ResumeOutcome::Adopted(c) => info!(pattern = %c.pattern, objective = c.objective, "adopted next candidate"),
        ResumeOutcome::Exhausted => info!(path = %path.display(), "ranking exhausted"),
    }
    Ok(outcome)
}

fn parse_row(line: &str, line_no: usize) -> Result<RankingRow, RankingError> {
    let malformed = |reason: String| RankingError::Malformed { line: line_no, reason };
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 5 {
        return Err(malformed(format!("expected at least 5 columns, found {}", fields.len())));
    }

    let pattern: Pattern = fields[0].parse().map_err(malformed)?;
    let flag = |s: &str, name: &str| match s {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(malformed(format!("{name} flag must be 0 or 1, got `{other}`"))),
    };
    let adopted = flag(fields[1], "adopted")?;
    let attempted = flag(fields[2], "attempted")?;

    let n = fields.len();
    let assignments = fields[3..n - 2]
        .iter()
        .map(|f| parse_assignment(f).ok_or_else(|| malformed(format!("invalid module assignment `{f}`"))))
        .collect::<Result<Vec<_>, _>>()?;
    let rates = if fields[n - 2].is_empty() {
        Vec::new()
    } else {
        fields[n - 2]
            .split(',')
            .map(|r| r.parse::<f64>().map_err(|_| malformed(format!("invalid rate `{r}`"))))
            .collect::<Result<Vec<_>, _>>()?
    };
    let objective = fields[n - 1]
        .parse::<f64>()
        .map_err(|_| malformed(format!("invalid objective `{}`", fields[n - 1])))?;

    Ok(RankingRow {
        candidate: Candidate {
            pattern,
            assignments,
            rates,
            objective,
        },
        adopted,
        attempted,
    })
}

fn parse_assignment(field: &str) -> Option<Assignment> {
    let mut parts = field.split(':');
    let substrate = Substrate::from_label(parts.next()?)?;
    let device: i64 = parts.next()?.parse().ok()?;
    let replicas: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Assignment {
        substrate,
        device: usize::try_from(device).ok(),
        replicas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(pattern: &str, replicas: u32, objective: f64) -> Candidate {
        Candidate {
            pattern: pattern.parse().unwrap(),
            assignments: vec![
                Assignment {
                    substrate: Substrate::Switch,
                    device: None,
                    replicas: 1,
                },
                Assignment {
                    substrate: Substrate::Cpu,
                    device: Some(0),
                    replicas,
                },
            ],
            rates: vec![1.5e9, 2.5e8],
            objective,
        }
    }

    fn make_file(candidates: Vec<Candidate>) -> RankingFile {
        RankingFile::from_ranking(&Ranking::ordered(candidates))
    }

    #[test]
    fn objective_is_sum_of_marginals() {
        let bounds = [RateBounds::new(1e9, 2e9), RateBounds::new(1e8, 1e9)];
        let c = Candidate::new("1".parse().unwrap(), vec![], vec![1.5e9, 2.5e8], &bounds);
        assert_eq!(c.objective, 0.5e9 + 1.5e8);
    }

    #[test]
    fn ranking_is_stable_by_objective() {
        let r = Ranking::by_objective(vec![
            make_candidate("00", 1, 1.0),
            make_candidate("01", 1, 3.0),
            make_candidate("10", 1, 1.0),
        ]);
        let order: Vec<String> = r.candidates().iter().map(|c| c.pattern.to_string()).collect();
        assert_eq!(order, vec!["01", "00", "10"]);
    }

    #[test]
    fn render_then_parse_keeps_rows() {
        let file = make_file(vec![make_candidate("01", 2, 7.5e8), make_candidate("-", 1, 0.0)]);
        let text = file.render();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "01\t1\t1\tswitch:-1:1\tcpu:0:2\t1500000000,250000000\t750000000");
        assert_eq!(RankingFile::parse(&text).unwrap(), file);
    }

    #[test]
    fn advance_skips_rows_with_rejected_pattern() {
        let mut file = make_file(vec![
            make_candidate("01", 2, 3.0),
            make_candidate("01", 1, 2.0),
            make_candidate("10", 1, 1.0),
        ]);
        let next = file.advance().unwrap().clone();
        assert_eq!(next.pattern.to_string(), "10");
        let flags: Vec<(bool, bool)> = file.rows().iter().map(|r| (r.adopted, r.attempted)).collect();
        assert_eq!(flags, vec![(false, true), (false, true), (true, true)]);
        assert!(file.advance().is_none());
        assert!(file.adopted().is_none());
    }

    #[test]
    fn resume_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.txt");
        Ranking::ordered(vec![make_candidate("1", 1, 2.0), make_candidate("0", 1, 1.0)])
            .persist(&path)
            .unwrap();

        match resume(&path).unwrap() {
            ResumeOutcome::Adopted(c) => assert_eq!(c.pattern.to_string(), "0"),
            other => panic!("expected adoption, got {other:?}"),
        }
        let on_disk = RankingFile::load(&path).unwrap();
        assert_eq!(on_disk.adopted().map(|c| c.pattern.to_string()), Some("0".to_string()));

        assert_eq!(resume(&path).unwrap(), ResumeOutcome::Exhausted);
        assert_eq!(resume(&path).unwrap(), ResumeOutcome::Exhausted);
    }

    #[test]
    fn resume_without_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = resume(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, RankingError::Missing(_)));
    }

    #[test]
    fn malformed_rows_report_line() {
        let err = RankingFile::parse("01\t1\t1\tcpu:0:1\t1,2\t3\n01\t2\t0\tcpu:0:1\t1\t3\n").unwrap_err();
        assert!(matches!(err, RankingError::Malformed { line: 2, .. }), "{err}");
        let err = RankingFile::parse("01\t1\t1\tgpu:0:1\t1\t3\n").unwrap_err();
        assert!(matches!(err, RankingError::Malformed { line: 1, .. }));
    }

    #[test]
    fn cpu_replicas_counts_cpu_modules() {
        assert_eq!(make_candidate("1", 3, 0.0).cpu_replicas(), 3);
    }
}
