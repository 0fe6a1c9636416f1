use clap::Args;
use rollcall::config::AppConfig;
use rollcall::error::AppError;
use rollcall::telemetry;
use rollcall::workflows::roster::{
    ParameterSet, ReportFormat, RosterPipeline, RosterReports, RunParameterOverrides,
    RunParameters, RunPreset, WidthPolicy, WrittenReport,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Roster CSV or Excel workbook with District, Block, School, School_ID and
    /// Total_Students columns
    #[arg(long, short)]
    pub(crate) input: PathBuf,
    /// Directory for the generated reports (defaults to ROSTER_OUTPUT_DIR)
    #[arg(long, short)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Report file format, csv or xlsx
    #[arg(long, default_value = "csv", value_parser = crate::infra::parse_report_format)]
    pub(crate) format: ReportFormat,
    /// Largest roster, in students after the buffer, accepted (defaults to ROSTER_MAX_STUDENTS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) max_students: Option<u64>,
    /// Starting preset, standard or custom (defaults to ROSTER_PRESET)
    #[arg(long, value_parser = crate::infra::parse_preset)]
    pub(crate) preset: Option<RunPreset>,
    /// Partner identifier placed in templates that include Partner
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) partner_id: Option<i64>,
    /// Grade, rendered with two digits in roll numbers
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) grade: Option<i64>,
    /// Percentage added to every school's declared student count (0-100)
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) buffer_percent: Option<f64>,
    #[arg(long)]
    pub(crate) district_digits: Option<usize>,
    #[arg(long)]
    pub(crate) block_digits: Option<usize>,
    #[arg(long)]
    pub(crate) school_digits: Option<usize>,
    #[arg(long)]
    pub(crate) student_digits: Option<usize>,
    /// Identifier template, A1 through A8
    #[arg(long, value_parser = crate::infra::parse_parameter_set)]
    pub(crate) param: Option<ParameterSet>,
    /// What to do when a district, block or school code outgrows its width: fail or widen
    #[arg(long, value_parser = crate::infra::parse_width_policy)]
    pub(crate) code_overflow: Option<WidthPolicy>,
    /// What to do when a student number outgrows its width: fail or widen
    #[arg(long, value_parser = crate::infra::parse_width_policy)]
    pub(crate) student_overflow: Option<WidthPolicy>,
    /// Also print every mapped roll number
    #[arg(long)]
    pub(crate) print_rolls: bool,
}

impl GenerateArgs {
    pub(crate) fn overrides(&self) -> RunParameterOverrides {
        RunParameterOverrides {
            partner_id: self.partner_id,
            grade: self.grade,
            buffer_percent: self.buffer_percent,
            district_digits: self.district_digits,
            block_digits: self.block_digits,
            school_digits: self.school_digits,
            student_digits: self.student_digits,
            selected_param: self.param,
            code_overflow: self.code_overflow,
            student_overflow: self.student_overflow,
        }
    }
}

pub(crate) fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let preset = args.preset.unwrap_or(config.roster.preset);
    let params = args.overrides().apply(preset.parameters());
    let max_students = args.max_students.unwrap_or(config.roster.max_students);
    let pipeline = RosterPipeline::new(params)?.with_max_students(max_students);

    let reports = pipeline.run_path(&args.input)?;
    let output_dir = args.output_dir.unwrap_or(config.roster.output_dir);
    let written = reports.write_to_dir(&output_dir, args.format)?;

    render_run(
        &args.input,
        pipeline.parameters(),
        &reports,
        &written,
        args.print_rolls,
    );
    Ok(())
}

pub(crate) fn list_parameter_sets() {
    println!("Identifier templates");
    for set in ParameterSet::ordered() {
        println!("  {:<3} {}", set.key(), set.description());
    }
}

fn render_run(
    input: &std::path::Path,
    params: &RunParameters,
    reports: &RosterReports,
    written: &[WrittenReport],
    print_rolls: bool,
) {
    let summary = &reports.summary;
    println!("Roster: {}", input.display());
    println!(
        "Template {} ({}), partner {}, grade {}, buffer {}%",
        summary.parameter_set,
        summary.parameter_description,
        params.partner_code(),
        params.grade_code(),
        params.buffer_percent
    );
    println!(
        "  {} schools ({} without students) across {} districts and {} blocks",
        summary.schools, summary.empty_schools, summary.districts, summary.blocks
    );
    println!("  {} students generated", summary.students);

    println!("\nReports");
    for report in written {
        println!(
            "  {:<13} {:>8} rows  {}",
            report.kind.to_string(),
            report.rows,
            report.path.display()
        );
    }

    if print_rolls {
        println!("\nRoll numbers");
        for row in &reports.mapped {
            println!(
                "  {}  {} ({})",
                row.roll_number, row.school_name, row.school_code
            );
        }
    }
}
