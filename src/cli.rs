use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "footfix")]
#[command(version)]
#[command(about = "Normalize footnote formatting in a .docx file", long_about = None)]
#[command(after_help = "Examples:\n  \
  footfix thesis.docx                 write thesis_fixed_<timestamp>.docx next to the input\n  \
  footfix thesis.docx final.docx      write the result to final.docx\n  \
  footfix -v thesis.docx              also log each processing stage")]
pub struct Cli {
    /// Input .docx file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output .docx file (default: <input>_fixed_<YYYYmmdd_HHMM>.docx)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Log more (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Log level selected by `-v`/`-q`; `RUST_LOG` takes precedence
    pub fn log_level(&self) -> LevelFilter {
        if self.is_very_quiet() {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
