//! Stats Command Implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use hashlr_data::{common_count, DatasetStats};

use super::open_events;

/// Print dataset statistics
///
/// Reports size, click-through rate, vocabulary and users of a training
/// file, and their overlap with a test file when one is given.
#[derive(Args, Debug, Clone)]
pub struct StatsCommand {
    /// Training file (labeled lines)
    #[arg(long, short = 't', env = "HASHLR_TRAIN")]
    pub train: PathBuf,

    /// Test file (unlabeled lines)
    #[arg(long, env = "HASHLR_TEST")]
    pub test: Option<PathBuf>,

    /// Read at most this many events per file
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of most frequent tokens to list
    #[arg(long, default_value = "10")]
    pub top: usize,
}

fn collect(path: &Path, labeled: bool, limit: Option<u64>) -> Result<DatasetStats> {
    let mut stats = DatasetStats::new();
    for event in open_events(path, labeled, limit)? {
        let event = event.with_context(|| format!("Failed to read {}", path.display()))?;
        stats.record(&event);
    }
    Ok(stats)
}

impl StatsCommand {
    /// Runs the command.
    pub fn run(&self) -> Result<()> {
        let train = collect(&self.train, true, self.limit)?;
        println!("train_events\t{}", train.count());
        println!("train_clicks\t{}", train.clicks());
        println!("train_impressions\t{}", train.impressions());
        println!("average_ctr\t{:.6}", train.average_ctr());
        println!("unique_tokens\t{}", train.unique_tokens().len());
        println!("unique_users\t{}", train.unique_users().len());
        if let Some((index, impressions)) = train.max_impressions() {
            println!("max_impressions\t{impressions} (event {index})");
        }
        if let Some((index, clicks)) = train.max_clicks() {
            println!("max_clicks\t{clicks} (event {index})");
        }
        for (token, freq) in train.top_tokens(self.top) {
            println!("token\t{token}\t{freq}");
        }

        if let Some(path) = &self.test {
            let test = collect(path, false, self.limit)?;
            println!("test_events\t{}", test.count());
            println!("test_unique_tokens\t{}", test.unique_tokens().len());
            println!("test_unique_users\t{}", test.unique_users().len());
            println!(
                "shared_tokens\t{}",
                common_count(train.unique_tokens(), test.unique_tokens())
            );
            println!(
                "shared_users\t{}",
                common_count(train.unique_users(), test.unique_users())
            );
        }
        Ok(())
    }
}
