use std::path::Path;

use bullseye_core::acquisition::Snapshot;
use bullseye_core::analysis::{BeamMetrics, FitQuality};
use bullseye_core::capture::CaptureSettings;
use bullseye_core::config::ProcessConfig;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    fn on_off(&self, enabled: bool) -> String {
        if enabled {
            self.method.apply_to("on").to_string()
        } else {
            self.disabled.apply_to("off").to_string()
        }
    }
}

/// Settings block printed before acquisition starts.
pub fn print_session_summary(
    source: &str,
    settings: &CaptureSettings,
    process: &ProcessConfig,
    record: Option<&Path>,
) {
    let s = Styles::new();
    let geometry = settings.geometry();

    println!();
    println!("  {}", s.title.apply_to("Bullseye"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(8)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Source"), s.method.apply_to(source));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Sensor"),
        s.value.apply_to(format!(
            "{}x{} px, {} µm/px, maxval {}",
            geometry.width, geometry.height, geometry.pixel_size, geometry.maxval
        ))
    );
    if let Some(path) = record {
        println!("  {:<14}{}", s.label.apply_to("Record"), s.path.apply_to(path.display()));
    }

    println!();
    println!("  {}", s.header.apply_to("Capture"));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Shutter"),
        s.value.apply_to(format!("{:.3} ms", settings.shutter() * 1e3))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Gain"),
        s.value.apply_to(format!("{:.1} dB", settings.gain()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Framerate"),
        s.value.apply_to(format!("{:.1} fps", settings.framerate()))
    );
    println!("  {:<14}{}", s.label.apply_to("Average"), s.value.apply_to(settings.average()));
    println!("  {:<14}{}", s.label.apply_to("Auto expose"), s.on_off(settings.auto_exposure()));
    println!("  {:<14}{}", s.label.apply_to("Dark frame"), s.on_off(settings.dark()));

    println!();
    println!("  {}", s.header.apply_to("Process"));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Crops"),
        s.value.apply_to(format!("{} x {} diameters", process.crops, process.rad))
    );
    if process.ignore > 0.0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Ignore"),
            s.value.apply_to(format!("{:.1}%", process.ignore * 100.0))
        );
    } else {
        println!("  {:<14}{}", s.label.apply_to("Ignore"), s.disabled.apply_to("sigma crop"));
    }
    if process.background > 0.0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Background"),
            s.value.apply_to(format!("{:.1} percentile", process.background * 100.0))
        );
    }
    println!("  {:<14}{}", s.label.apply_to("Tracking"), s.on_off(process.track));
    println!();
}

/// Full metrics block for a single snapshot.
pub fn print_snapshot(snapshot: &Snapshot) {
    let s = Styles::new();

    println!();
    println!(
        "  {} {}",
        s.header.apply_to("Frame"),
        s.value.apply_to(snapshot.frame_index)
    );
    match snapshot.metrics.quality {
        FitQuality::Good => {}
        FitQuality::LowSignal => println!("  {}", s.disabled.apply_to("no beam detected")),
        FitQuality::Degenerate => println!("  {}", s.disabled.apply_to("degenerate beam shape")),
    }
    for line in snapshot.metrics.summary().lines() {
        match line.split_once(": ") {
            Some((label, value)) => {
                println!("  {:<16}{}", s.label.apply_to(label), s.value.apply_to(value))
            }
            None => println!("  {}", line),
        }
    }
    println!();
}

/// One-line form of the metrics for continuous output.
pub fn beam_line(frame_index: u64, metrics: &BeamMetrics) -> String {
    match metrics.quality {
        FitQuality::Good => {}
        FitQuality::LowSignal => return format!("{:>6}  no beam", frame_index),
        FitQuality::Degenerate => {
            return format!(
                "{:>6}  x {:>9.2}  y {:>9.2}  degenerate beam shape",
                frame_index, metrics.x, metrics.y
            )
        }
    }
    format!(
        "{:>6}  x {:>9.2}  y {:>9.2}  a {:>8.2}  b {:>8.2}  t {:>6.1}  e {:.3}  peak {:.3}",
        frame_index, metrics.x, metrics.y, metrics.a, metrics.b, metrics.t, metrics.e, metrics.peak
    )
}
