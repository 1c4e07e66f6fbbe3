use clap::Parser;

/// This is a tabulation program for per-section electoral results and coalition goals.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file containing the description of the election, in JSON format.
    /// Without it, the built-in catalog of parties and coalitions is used.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected summary in JSON format. If provided, egtrack will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the results are read from this file. Setting this option overrides the
    /// record sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Geographic selection
    /// Only keep the sections of this municipality ('all' for no restriction).
    #[clap(long, value_parser)]
    pub municipality: Option<String>,

    /// Only keep the sections of this local district.
    #[clap(long, value_parser)]
    pub local_district: Option<String>,

    /// Only keep the sections of this federal district.
    #[clap(long, value_parser)]
    pub federal_district: Option<String>,

    /// Only keep this section.
    #[clap(long, value_parser)]
    pub section: Option<String>,

    // Goal
    /// The coalition (name) or party (code) to track.
    #[clap(long, value_parser)]
    pub coalition: Option<String>,

    /// (1 to 100) The goal, in percent.
    #[clap(long, value_parser)]
    pub target: Option<f64>,

    /// (default total) What the goal is a percentage of: 'coalition' or 'total'.
    #[clap(long, value_parser)]
    pub basis: Option<String>,

    /// (file path) If specified, the sections of the goal are written to this file in CSV format.
    #[clap(long, value_parser)]
    pub worklist: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
