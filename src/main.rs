use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use treelist::{CharacterFormat, DelimitedFormat, TreeFormat, TreeList, TreeListConfig};

#[derive(Parser, Debug)]
#[command(name = "treelist", about = "Group the lines of a file into a tree")]
struct Cli {
    /// Log tree maintenance at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the visible rows, indented by depth.
    Show {
        #[command(flatten)]
        layout: Layout,
        /// Start with every node collapsed.
        #[arg(long)]
        collapsed: bool,
    },
    /// Print node counts for the grouped file.
    Stats {
        #[command(flatten)]
        layout: Layout,
    },
}

#[derive(Args, Debug)]
struct Layout {
    /// Input file, one element per line.
    file: PathBuf,
    /// Path delimiter (ignored with --chars).
    #[arg(long, default_value_t = '/')]
    delimiter: char,
    /// One path segment per character.
    #[arg(long)]
    chars: bool,
    /// Order siblings by segment instead of first appearance.
    #[arg(long)]
    sorted: bool,
    /// Reject lines nested deeper than this.
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Show { layout, collapsed } => {
            let config = config_for(&layout, collapsed);
            if layout.chars {
                let format = if layout.sorted {
                    CharacterFormat::sorted()
                } else {
                    CharacterFormat::new()
                };
                run_show(&layout.file, format, config)?
            } else {
                let format = DelimitedFormat::new(layout.delimiter).with_sorting(layout.sorted);
                run_show(&layout.file, format, config)?
            }
        }
        Commands::Stats { layout } => {
            let config = config_for(&layout, false);
            if layout.chars {
                run_stats(&layout.file, CharacterFormat::new(), config)?
            } else {
                run_stats(&layout.file, DelimitedFormat::new(layout.delimiter), config)?
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("treelist=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("treelist=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn config_for(layout: &Layout, collapsed: bool) -> TreeListConfig {
    let mut config = TreeListConfig::default().with_default_expanded(!collapsed);
    if let Some(max_depth) = layout.max_depth {
        config = config.with_max_depth(max_depth);
    }
    config
}

fn build<F>(path: &Path, format: F, config: TreeListConfig) -> Result<TreeList<String, F>>
where
    F: TreeFormat<String>,
{
    let mut tree = TreeList::with_config(format, config).context("invalid tree configuration")?;
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );

    tree.begin_event();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        tree.push_source(line)
            .with_context(|| format!("line {} cannot be placed in the tree", idx + 1))?;
    }
    tree.commit_event()?;

    info!(elements = tree.source_len(), nodes = tree.total_len(), "tree built");
    Ok(tree)
}

fn run_show<F>(path: &Path, format: F, config: TreeListConfig) -> Result<()>
where
    F: TreeFormat<String>,
    F::Segment: Display,
{
    let tree = build(path, format, config)?;
    for row in tree.rows() {
        let marker = match (row.has_children(), row.is_expanded()) {
            (false, _) => ' ',
            (true, true) => '-',
            (true, false) => '+',
        };
        let suffix = if row.is_virtual() { "*" } else { "" };
        println!(
            "{}{} {}{}",
            "  ".repeat(row.depth()),
            marker,
            row.segment(),
            suffix
        );
    }
    debug!(rows = tree.len(), "rows printed");
    Ok(())
}

fn run_stats<F>(path: &Path, format: F, config: TreeListConfig) -> Result<()>
where
    F: TreeFormat<String>,
{
    let tree = build(path, format, config)?;
    let mut real = 0;
    let mut roots = 0;
    let mut max_depth = 0;
    for row in tree.nodes() {
        real += usize::from(!row.is_virtual());
        roots += usize::from(row.depth() == 0);
        max_depth = max_depth.max(row.depth());
    }

    println!("elements\t{}", tree.source_len());
    println!("nodes\t{}", tree.total_len());
    println!("visible\t{}", tree.len());
    println!("real\t{}", real);
    println!("virtual\t{}", tree.total_len() - real);
    println!("roots\t{}", roots);
    println!("max_depth\t{}", max_depth);
    Ok(())
}
