//! Metrics table output
//!
//! Writes one delimited row per finalized iteration. Which columns appear, and
//! in which order, is configurable; the default set reproduces the historical
//! analysis header.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::str::FromStr;
use trial_log_decoder::{IterationMetrics, TrialConfig};

/// An output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "practice")]
    Practice,
    #[serde(rename = "incentive")]
    Incentive,
    #[serde(rename = "targets")]
    Targets,
    #[serde(rename = "speed")]
    Speed,
    #[serde(rename = "oprange")]
    OpRange,
    #[serde(rename = "difficulty")]
    Difficulty,
    #[serde(rename = "addition")]
    Addition,
    #[serde(rename = "target")]
    Target,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "hits")]
    Hits,
    #[serde(rename = "friendHits")]
    FriendHits,
    #[serde(rename = "shots")]
    Shots,
    #[serde(rename = "hovers")]
    Hovers,
    #[serde(rename = "operand1")]
    Operand1,
    #[serde(rename = "operand2")]
    Operand2,
    #[serde(rename = "meanHitInterval")]
    MeanHitInterval,
    #[serde(rename = "iteration")]
    Iteration,
    #[serde(rename = "subject")]
    Subject,
    #[serde(rename = "block")]
    Block,
    #[serde(rename = "trial")]
    Trial,
}

impl Column {
    pub const ALL: [Column; 20] = [
        Column::Practice,
        Column::Incentive,
        Column::Targets,
        Column::Speed,
        Column::OpRange,
        Column::Difficulty,
        Column::Addition,
        Column::Target,
        Column::Complete,
        Column::Hits,
        Column::FriendHits,
        Column::Shots,
        Column::Hovers,
        Column::Operand1,
        Column::Operand2,
        Column::MeanHitInterval,
        Column::Iteration,
        Column::Subject,
        Column::Block,
        Column::Trial,
    ];

    /// Historical column set
    pub fn default_set() -> Vec<Column> {
        vec![
            Column::Practice,
            Column::Targets,
            Column::Speed,
            Column::OpRange,
            Column::Difficulty,
            Column::Addition,
            Column::Target,
            Column::Complete,
            Column::Hits,
            Column::FriendHits,
            Column::Shots,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Practice => "practice",
            Column::Incentive => "incentive",
            Column::Targets => "targets",
            Column::Speed => "speed",
            Column::OpRange => "oprange",
            Column::Difficulty => "difficulty",
            Column::Addition => "addition",
            Column::Target => "target",
            Column::Complete => "complete",
            Column::Hits => "hits",
            Column::FriendHits => "friendHits",
            Column::Shots => "shots",
            Column::Hovers => "hovers",
            Column::Operand1 => "operand1",
            Column::Operand2 => "operand2",
            Column::MeanHitInterval => "meanHitInterval",
            Column::Iteration => "iteration",
            Column::Subject => "subject",
            Column::Block => "block",
            Column::Trial => "trial",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.name() == name.trim())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::from_name(s).ok_or_else(|| format!("unknown column {:?}", s.trim()))
    }
}

/// Where a trial's rows came from
#[derive(Debug, Clone, Copy)]
pub struct TrialContext<'a> {
    pub subject: u32,
    pub block: &'a str,
    pub trial: &'a str,
}

/// Delimited table writer; rows are written in call order
pub struct TableWriter<W: Write> {
    out: W,
    columns: Vec<Column>,
    delimiter: String,
    rows_written: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W, columns: Vec<Column>, delimiter: impl Into<String>) -> Self {
        Self {
            out,
            columns,
            delimiter: delimiter.into(),
            rows_written: 0,
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        let header: Vec<&str> = self.columns.iter().map(|c| c.name()).collect();
        writeln!(self.out, "{}", header.join(&self.delimiter))
    }

    /// Write one row per record of a trial; returns the number of rows
    pub fn write_trial(
        &mut self,
        context: TrialContext<'_>,
        config: &TrialConfig,
        records: &[IterationMetrics],
    ) -> io::Result<usize> {
        for (index, record) in records.iter().enumerate() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|column| format_cell(*column, context, config, index + 1, record))
                .collect();
            writeln!(self.out, "{}", cells.join(&self.delimiter))?;
        }
        self.rows_written += records.len();
        Ok(records.len())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn format_cell(
    column: Column,
    context: TrialContext<'_>,
    config: &TrialConfig,
    iteration: usize,
    record: &IterationMetrics,
) -> String {
    match column {
        Column::Practice => config.practice.to_string(),
        Column::Incentive => config.incentive.to_string(),
        Column::Targets => config.target_number.to_string(),
        Column::Speed => config.target_speed.to_string(),
        Column::OpRange => format_range(&config.addition_difficulty),
        Column::Difficulty => config.target_difficulty.to_string(),
        Column::Addition => format!("{:.6}", record.addition_latency),
        Column::Target => format!("{:.6}", record.target_latency),
        Column::Complete => format!("{:.6}", record.completion_latency),
        Column::Hits => record.targets_hit.to_string(),
        Column::FriendHits => record.friend_hits.to_string(),
        Column::Shots => record.shots.to_string(),
        Column::Hovers => record.hovers.to_string(),
        Column::Operand1 => record.operand1.to_string(),
        Column::Operand2 => record.operand2.to_string(),
        Column::MeanHitInterval => format!("{:.6}", record.mean_hit_interval()),
        Column::Iteration => iteration.to_string(),
        Column::Subject => context.subject.to_string(),
        Column::Block => context.block.to_string(),
        Column::Trial => context.trial.to_string(),
    }
}

/// `[1 5]`, space separated inside brackets
fn format_range(range: &[i64]) -> String {
    let parts: Vec<String> = range.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IterationMetrics {
        IterationMetrics {
            addition_latency: 2.5,
            target_latency: 5.0,
            completion_latency: 5.0,
            targets_hit: 1,
            friend_hits: 0,
            shots: 4,
            hovers: 2,
            operand1: 3,
            operand2: 9,
            hit_intervals: vec![1.0, 2.0],
        }
    }

    fn context() -> TrialContext<'static> {
        TrialContext {
            subject: 5,
            block: "block1",
            trial: "trial2",
        }
    }

    #[test]
    fn test_default_header_and_row() {
        let config = TrialConfig::new(3)
            .with_speed(400)
            .with_addition_difficulty(vec![1, 5]);
        let mut writer = TableWriter::new(Vec::new(), Column::default_set(), ", ");
        writer.write_header().unwrap();
        writer.write_trial(context(), &config, &[record()]).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "practice, targets, speed, oprange, difficulty, addition, target, complete, hits, friendHits, shots"
        );
        assert_eq!(
            lines[1],
            "false, 3, 400, [1 5], 0, 2.500000, 5.000000, 5.000000, 1, 0, 4"
        );
    }

    #[test]
    fn test_custom_columns() {
        let columns = vec![
            Column::Subject,
            Column::Block,
            Column::Trial,
            Column::Iteration,
            Column::Hovers,
            Column::MeanHitInterval,
        ];
        let mut writer = TableWriter::new(Vec::new(), columns, "\t");
        let rows = writer
            .write_trial(context(), &TrialConfig::new(1), &[record(), record()])
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "5\tblock1\ttrial2\t1\t2\t1.500000");
        assert_eq!(lines[1], "5\tblock1\ttrial2\t2\t2\t1.500000");
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(" friendHits".parse::<Column>(), Ok(Column::FriendHits));
        assert!("bogus".parse::<Column>().is_err());
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
    }
}
