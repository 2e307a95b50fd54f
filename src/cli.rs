use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pkgexec")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deployment package executor", long_about = None)]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[allow(dead_code)]
    #[arg(long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Verbosity level of diagnostic output
    #[arg(long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Default package directory
    #[arg(long, env = crate::paths::ENV_PACKAGE_DIR, value_name = "DIR")]
    pub package_dir: Option<String>,

    /// Package, options and package parameters:
    /// <package> [targetdirectory:<dir>] [log:<file>] [loglevel:<level>]
    /// [-help|-?] [-schema] [-wait] [<name>:<value> ...]
    #[arg(allow_hyphen_values = true, trailing_var_arg = true, value_name = "ARGS")]
    pub args: Vec<String>,
}
