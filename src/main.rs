use std::env;
use std::io::{self, BufRead};
use std::process;
use std::str::FromStr;
use std::thread::spawn;

use elevator_bank::config::FleetConfig;
use elevator_bank::debug::FleetMonitor;
use elevator_bank::dispatcher::Dispatcher;

fn parse_number<T: FromStr>(what: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} {} is not a number", what, value))
}

fn parse_args(args: &[String]) -> Result<FleetConfig, String> {
    let mut config = FleetConfig::default();

    // Load the config file first so explicit flags override it.
    for arg_pair in args.rchunks_exact(2) {
        if arg_pair[0] == "--config" {
            config = FleetConfig::from_file(&arg_pair[1]).map_err(|err| err.to_string())?;
        }
    }

    let (mut floors, mut max) = (None, None);
    for arg_pair in args.rchunks_exact(2) {
        match arg_pair[0].as_str() {
            "--elevators" => config.elevators = parse_number("elevator count", &arg_pair[1])?,
            "--floors" => floors = Some(parse_number::<i32>("floor count", &arg_pair[1])?),
            "--min" => config.min_floor = parse_number("min floor", &arg_pair[1])?,
            "--max" => max = Some(parse_number::<i32>("max floor", &arg_pair[1])?),
            "--service" => config.service_floor = Some(parse_number("service floor", &arg_pair[1])?),
            "--config" => (),
            other => eprintln!("illegal argument {}, skipping...", other),
        }
    }
    // An explicit max floor wins over a floor count.
    if let Some(n) = floors {
        config.max_floor = n;
    }
    if let Some(n) = max {
        config.max_floor = n;
    }
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };

    let dispatcher = match Dispatcher::create(config) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            eprintln!("could not start fleet: {}", err);
            process::exit(1);
        }
    };
    println!(
        "Fleet started with {} elevator(s). Commands: call <floor> | cab <elevator> <floor> | reinstate <elevator> | status | quit",
        dispatcher.elevator_count()
    );

    let events = dispatcher.events();
    spawn(move || {
        for event in events.iter() {
            tracing::info!(?event, "fleet event");
        }
    });

    let mut monitor = FleetMonitor::new();
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            ["call", floor] => parse_number("floor", floor)
                .and_then(|floor| dispatcher.request_floor(floor).map_err(|e| e.to_string())),
            ["cab", elevator, floor] => parse_number("elevator", elevator).and_then(|elevator| {
                parse_number("floor", floor)
                    .and_then(|floor| dispatcher.cab_request(elevator, floor).map_err(|e| e.to_string()))
            }),
            ["reinstate", elevator] => parse_number("elevator", elevator)
                .and_then(|elevator| dispatcher.reinstate(elevator).map_err(|e| e.to_string())),
            ["status"] => dispatcher
                .status()
                .map_err(|e| e.to_string())
                .and_then(|status| monitor.printstatus(&status).map_err(|e| e.to_string())),
            ["quit"] | ["exit"] => break,
            [] => Ok(()),
            _ => Err(format!("unknown command: {}", line)),
        };
        if let Err(message) = result {
            eprintln!("{}", message);
        }
    }
}
