use std::env;
use std::net::SocketAddr;

use contracts::HUNT_TARGET_CHALLENGES;
use hunt_api::{default_sqlite_path, serve, Catalog, HuntService, HuntStore};
use hunt_core::selector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("hunt-cli <command>");
    println!("commands:");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  rooms [sqlite_path]");
    println!("    lists stored rooms with live completion counts");
    println!("  select-demo <city_id> <seed> [target]");
    println!("    prints a deterministic challenge selection for a city");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid seed: {raw}"))
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn list_rooms(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let store = HuntStore::open(&sqlite_path)
        .map_err(|err| format!("failed to open store at {sqlite_path}: {err}"))?;
    let service = HuntService::new(store, Catalog::builtin());

    let summaries = service
        .all_room_summaries()
        .map_err(|err| format!("failed to list rooms: {err}"))?;

    if summaries.is_empty() {
        println!("no rooms in {sqlite_path}");
        return Ok(());
    }

    for summary in summaries {
        println!("{summary}");
    }
    Ok(())
}

fn run_select_demo(args: &[String]) -> Result<(), String> {
    let city_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing city_id".to_string())?;
    let seed = parse_seed(args.get(3))?;
    let target = args
        .get(4)
        .map(|value| {
            value
                .parse::<usize>()
                .map_err(|_| format!("invalid target: {value}"))
        })
        .transpose()?
        .unwrap_or(HUNT_TARGET_CHALLENGES);

    let catalog = Catalog::builtin();
    let pool = catalog
        .eligible_pool(&city_id)
        .ok_or_else(|| format!("unknown city: {city_id}"))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let ids = selector::select(&pool, &[], target, &mut rng);

    println!(
        "city={} seed={} target={} selected={}",
        city_id,
        seed,
        target,
        ids.len()
    );
    for challenge in pool.iter().filter(|challenge| ids.contains(&challenge.id)) {
        println!("  {} {}", challenge.id, challenge.caption);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                init_tracing();
                let sqlite_path = default_sqlite_path();
                let service = match HuntService::open(&sqlite_path) {
                    Ok(service) => service,
                    Err(err) => {
                        eprintln!("failed to open {sqlite_path}: {err}");
                        std::process::exit(1);
                    }
                };

                println!("serving api on http://{addr} (sqlite: {sqlite_path})");
                if let Err(err) = serve(addr, service).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {}", err);
                print_usage();
                std::process::exit(2);
            }
        },
        Some("rooms") => {
            if let Err(err) = list_rooms(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("select-demo") => {
            if let Err(err) = run_select_demo(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
