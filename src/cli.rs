use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "playground", about = "Terminal code playground for JavaScript, Python and HTML", version)]
#[command(group(ArgGroup::new("maintenance").args(["list_languages", "list_themes", "show_state", "reset_state"]).multiple(false)))]
#[command(group(ArgGroup::new("output_switch").args(["json", "no_color"]).multiple(false)))]
pub struct Cli {
    /// File to open in the editor.
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Run a file once and print the result instead of opening the editor ("-" reads stdin).
    #[arg(long, value_name = "FILE", conflicts_with = "file")]
    pub run: Option<String>,

    /// Language of the source (javascript, python, html). Defaults to the file extension.
    #[arg(short = 'l', long = "lang")]
    pub lang: Option<String>,

    /// Print the run outcome as JSON (with --run or piped source).
    #[arg(long)]
    pub json: bool,

    /// Disable colored output for --run.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Theme to start the editor with (monokai, dracula, material, nord, solarized).
    #[arg(long)]
    pub theme: Option<String>,

    /// List supported languages.
    #[arg(long = "list-languages")]
    pub list_languages: bool,

    /// List editor themes.
    #[arg(long = "list-themes")]
    pub list_themes: bool,

    /// Print the saved editor state.
    #[arg(long = "show-state")]
    pub show_state: bool,

    /// Delete the saved editor state.
    #[arg(long = "reset-state")]
    pub reset_state: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// `--json` only shapes headless output, so the editor rejects it.
    pub fn check_headless_flags(&self, headless: bool) -> Result<()> {
        if self.json && !headless {
            bail!("--json needs --run FILE or source piped on stdin");
        }
        Ok(())
    }
}
