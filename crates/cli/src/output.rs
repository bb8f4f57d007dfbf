use nightfall_sim::report::BatchReport;
use std::time::Duration;

pub fn print_report(report: &BatchReport, elapsed: Duration) {
    print!("{}", report.render_summary());
    println!("\n  Time:        {:.2}s", elapsed.as_secs_f64());
    println!("========================================");
}
