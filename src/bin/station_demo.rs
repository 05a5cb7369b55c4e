use station_sim::{ArrivalSchedule, LogObserver, Station, StationConfig};
use std::sync::Arc;
use std::time::Duration;

/// Usage: station_demo [waiting_capacity] [pumps] [car,car,...]
fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let capacity = parse_arg(&args, 0, 3)?;
    let pumps = parse_arg(&args, 1, 2)?;
    let cars = args.get(2).map(String::as_str).unwrap_or("C1,C2,C3,C4,C5,C6");

    let config = StationConfig::new()
        .with_waiting_capacity(capacity)
        .with_pump_count(pumps)
        .with_arrival_jitter(Duration::from_millis(100), Duration::from_millis(300));
    let schedule = ArrivalSchedule::parse(cars, Duration::from_millis(500));
    let expected = schedule.len() as u64;

    println!("Service station: {} waiting slots, {} pumps, {} cars", capacity, pumps, expected);

    let mut station = Station::with_observer(config, Arc::new(LogObserver)).map_err(|e| e.to_string())?;
    station.start().map_err(|e| e.to_string())?;
    station.feed(schedule).map_err(|e| e.to_string())?;

    let timeout = Duration::from_secs(10 + 2 * expected);
    if !station.wait_idle(timeout) {
        println!("Timed out after {:?}", timeout);
    }
    let abandoned = station.stop();
    let stats = station.stats();

    println!("Serviced:   {}", stats.serviced);
    println!("Cancelled:  {}", stats.cancelled);
    println!("Abandoned:  {}", stats.abandoned);
    for item in abandoned {
        println!("  never serviced: {}", item);
    }
    println!("Violations: {}", stats.violations);
    Ok(())
}

fn parse_arg(args: &[String], index: usize, default: usize) -> Result<usize, String> {
    match args.get(index) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("argument {} must be a non-negative integer, got '{}'", index + 1, raw)),
        None => Ok(default),
    }
}
