use console::Style;
use hicona_core::pipeline::config::PipelineConfig;
use hicona_core::pipeline::types::RunSummary;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    failure: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            failure: Style::new().red().bold(),
        }
    }
}

pub fn print_run_header(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("HiConA Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Source"),
        s.path.apply_to(config.source.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    if let Some(ref m) = config.measurement {
        println!("  {:<14}{}", s.label.apply_to("Measurement"), s.value.apply_to(m));
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Projection"),
        s.method.apply_to(config.projection)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("8-bit"),
        s.value.apply_to(if config.convert_to_8bit { "yes" } else { "no" })
    );

    match &config.stitch {
        Some(stitch) => println!(
            "  {:<14}{}",
            s.label.apply_to("Stitching"),
            s.method
                .apply_to(format!("reference channel {}", stitch.reference_channel))
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Stitching"),
            s.disabled.apply_to("disabled")
        ),
    }

    match &config.backend {
        Some(hicona_core::backend::BackendConfig::Cellpose(c)) => println!(
            "  {:<14}{}",
            s.label.apply_to("Backend"),
            s.method.apply_to(format!("Cellpose ({})", c.model))
        ),
        Some(hicona_core::backend::BackendConfig::ImagejMacro(c)) => println!(
            "  {:<14}{}",
            s.label.apply_to("Backend"),
            s.method
                .apply_to(format!("ImageJ macro ({})", c.macro_file.display()))
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Backend"),
            s.disabled.apply_to("none")
        ),
    }
    println!();
}

pub fn print_run_summary(summary: &RunSummary) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Run Summary"));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Measurements"),
        s.value.apply_to(summary.measurements)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Wells OK"),
        s.value.apply_to(summary.wells_ok)
    );
    if summary.wells_failed > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Wells failed"),
            s.failure.apply_to(summary.wells_failed)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("FOVs"),
        s.value.apply_to(summary.fovs_processed)
    );
    if summary.fovs_failed > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("FOVs failed"),
            s.failure.apply_to(summary.fovs_failed)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1?}", summary.elapsed))
    );
    println!();
}
