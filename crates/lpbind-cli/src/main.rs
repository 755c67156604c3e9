use clap::{Args, Parser, Subcommand, ValueEnum};
use lpbind::{
    IntegerOptions, Kkt, MathProgSource, Outcome, Problem, ProblemKind, SimplexOptions, SolStatus,
    SolverKind, SourceSpec, WriteOptions,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Read, solve and convert LP/MIP models")]
struct Cli {
    /// Log filter, overriding LPBIND_TRACE (for example, debug or lpbind=trace)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a model, solve it and write the requested files
    Solve(SolveArgs),
    /// Read a model and write it in other formats
    Convert(ConvertArgs),
    /// Print engine and solver versions
    Info,
}

#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Fixed MPS model to read
    #[arg(long)]
    mps: Option<PathBuf>,

    /// Free MPS model to read
    #[arg(long)]
    freemps: Option<PathBuf>,

    /// CPLEX LP model to read
    #[arg(long)]
    cpxlp: Option<PathBuf>,

    /// Native GLP model to read
    #[arg(long)]
    glp: Option<PathBuf>,

    /// MathProg model to translate
    #[arg(long)]
    gmp: Option<PathBuf>,

    /// MathProg data file
    #[arg(long, requires = "gmp")]
    gmp_data: Option<PathBuf>,

    /// MathProg display output file
    #[arg(long, requires = "gmp")]
    gmp_output: Option<PathBuf>,
}

impl SourceArgs {
    fn to_spec(&self) -> SourceSpec {
        SourceSpec {
            mps: self.mps.clone(),
            freemps: self.freemps.clone(),
            cpxlp: self.cpxlp.clone(),
            glp: self.glp.clone(),
            gmp: self.gmp.clone().map(|model| MathProgSource {
                model,
                data: self.gmp_data.clone(),
                output: self.gmp_output.clone(),
            }),
        }
    }
}

#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// Write the model as fixed MPS
    #[arg(long)]
    write_mps: Option<PathBuf>,

    /// Write the model as free MPS
    #[arg(long)]
    write_freemps: Option<PathBuf>,

    /// Write the model as CPLEX LP
    #[arg(long)]
    write_cpxlp: Option<PathBuf>,

    /// Write the model as native GLP
    #[arg(long)]
    write_glp: Option<PathBuf>,

    /// Write the basic solution report
    #[arg(long)]
    write_sol: Option<PathBuf>,

    /// Write the bound sensitivity report
    #[arg(long)]
    write_sens_bnds: Option<PathBuf>,

    /// Write the interior-point solution report
    #[arg(long)]
    write_ips: Option<PathBuf>,

    /// Write the MIP solution report
    #[arg(long)]
    write_mip: Option<PathBuf>,
}

impl OutputArgs {
    fn to_options(&self) -> WriteOptions {
        WriteOptions {
            mps: self.write_mps.clone(),
            freemps: self.write_freemps.clone(),
            cpxlp: self.write_cpxlp.clone(),
            glp: self.write_glp.clone(),
            sol: self.write_sol.clone(),
            sens_bnds: self.write_sens_bnds.clone(),
            ips: self.write_ips.clone(),
            mip: self.write_mip.clone(),
        }
    }
}

#[derive(Parser, Debug)]
struct SolveArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Solver to run
    #[arg(long, value_enum, default_value = "simplex")]
    method: Method,

    /// JSON file with solver options for the chosen method
    #[arg(long)]
    options: Option<PathBuf>,

    /// Include the KKT accuracy report
    #[arg(long)]
    kkt: bool,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum Method {
    Simplex,
    Exact,
    Interior,
    Integer,
    Intopt,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Simplex => "simplex",
            Method::Exact => "exact",
            Method::Interior => "interior",
            Method::Integer => "integer",
            Method::Intopt => "intopt",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct ColumnValue {
    name: Option<String>,
    value: f64,
}

#[derive(Debug, Clone, Serialize)]
struct SolveReport {
    name: Option<String>,
    rows: usize,
    cols: usize,
    nnz: usize,
    kind: ProblemKind,
    method: &'static str,
    outcome: String,
    solver: SolverKind,
    status: SolStatus,
    objective: f64,
    columns: Vec<ColumnValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kkt: Option<Kkt>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    lpbind::init_logging(cli.log.as_deref())?;
    match cli.command {
        Command::Solve(args) => solve_command(args),
        Command::Convert(args) => convert_command(args),
        Command::Info => {
            info_command();
            Ok(())
        }
    }
}

fn load_problem(source: &SourceArgs) -> Result<Problem, Box<dyn std::error::Error>> {
    let spec = source.to_spec();
    if spec.is_empty() {
        return Err(boxed_input_error(
            "one of --mps, --freemps, --cpxlp, --glp or --gmp is required",
        ));
    }
    Ok(Problem::from_spec(&spec)?)
}

fn load_options<T>(path: Option<&Path>) -> Result<T, Box<dyn std::error::Error>>
where
    T: DeserializeOwned + Default,
{
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(T::default()),
    }
}

fn run_method(
    problem: &Problem,
    method: Method,
    options: Option<&Path>,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let outcome = match method {
        Method::Simplex => problem.simplex(&load_options::<SimplexOptions>(options)?)?,
        Method::Exact => problem.exact(&load_options::<SimplexOptions>(options)?)?,
        Method::Interior => problem.interior()?,
        Method::Integer => {
            let options: IntegerOptions = load_options(options)?;
            if !options.presolve.unwrap_or(false) {
                let root = problem.simplex(&SimplexOptions::new())?;
                if problem.status_s() != SolStatus::Optimal {
                    return Ok(root);
                }
            }
            problem.integer(&options)?
        }
        Method::Intopt => problem.intopt(&load_options::<IntegerOptions>(options)?)?,
    };
    Ok(outcome)
}

fn solve_command(args: SolveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let problem = load_problem(&args.source)?;
    let outcome = run_method(&problem, args.method, args.options.as_deref())?;
    info!(
        component = "cli",
        operation = "solve",
        status = "success",
        method = args.method.as_str(),
        outcome = %outcome,
        "Solve finished"
    );

    let kkt = if args.kkt {
        Some(match problem.last_solver() {
            SolverKind::Mip => problem.kktint()?,
            SolverKind::Simplex | SolverKind::Interior => problem.kkt()?,
        })
    } else {
        None
    };

    let output = args.output.to_options();
    if !output.is_empty() {
        problem.write(&output)?;
    }

    let report = SolveReport {
        name: problem.name(),
        rows: problem.rows().len(),
        cols: problem.cols().len(),
        nnz: problem.nnz(),
        kind: problem.kind(),
        method: args.method.as_str(),
        outcome: outcome.to_string(),
        solver: problem.last_solver(),
        status: problem.status(),
        objective: problem.obj().value(),
        columns: problem
            .cols()
            .iter()
            .map(|col| -> lpbind::Result<ColumnValue> {
                Ok(ColumnValue {
                    name: col.name()?,
                    value: col.primal()?,
                })
            })
            .collect::<lpbind::Result<Vec<_>>>()?,
        kkt,
    };
    render_report(args.format, &report)
}

fn convert_command(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let output = args.output.to_options();
    if output.is_empty() {
        return Err(boxed_input_error("at least one --write-* option is required"));
    }
    let problem = load_problem(&args.source)?;
    problem.write(&output)?;
    println!("{problem}");
    Ok(())
}

fn info_command() {
    println!("lpbind {}", lpbind::env::version());
    match lpbind::env::solver_version() {
        Some(version) => println!("HiGHS {version}"),
        None => println!("HiGHS unknown"),
    }
}

fn render_report(
    format: OutputFormat,
    report: &SolveReport,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            print_report_table(report);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
            Ok(())
        }
    }
}

fn print_report_table(report: &SolveReport) {
    println!(
        "{:<10} {}",
        "problem",
        report.name.as_deref().unwrap_or("-")
    );
    println!(
        "{:<10} {} rows, {} cols, {} nonzeros",
        "size", report.rows, report.cols, report.nnz
    );
    println!("{:<10} {}", "method", report.method);
    println!("{:<10} {}", "outcome", report.outcome);
    println!("{:<10} {}", "status", report.status);
    println!("{:<10} {:.6}", "objective", report.objective);
    println!();
    println!("{:>6} {:<16} {:>14}", "no", "column", "value");
    for (k, col) in report.columns.iter().enumerate() {
        println!(
            "{:>6} {:<16} {:>14.6}",
            k,
            col.name.as_deref().unwrap_or("-"),
            col.value
        );
    }
    if let Some(kkt) = &report.kkt {
        println!();
        println!("{:<6} {:>12} {:>12} {:>8}", "cond", "abs_err", "rel_err", "quality");
        let groups = [
            ("pe", Some(kkt.pe)),
            ("pb", Some(kkt.pb)),
            ("de", kkt.de),
            ("db", kkt.db),
        ];
        for (label, cond) in groups {
            if let Some(cond) = cond {
                println!(
                    "{:<6} {:>12.3e} {:>12.3e} {:>8}",
                    label, cond.ae_max, cond.re_max, cond.quality
                );
            }
        }
    }
}

fn boxed_input_error(message: &str) -> Box<dyn std::error::Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message.to_string(),
    ))
}
