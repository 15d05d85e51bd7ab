use clap::Parser;
use log::{error, info, warn, LevelFilter};
use signed_ledger::cli::{display_keys, run_menu};
use signed_ledger::{
    Command, Config, LedgerClient, Opt, RequestDispatcher, Server, Wallet, GLOBAL_CONFIG,
};
use std::error::Error;
use std::io;
use std::process;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    // defaults, then the config file, then environment variables; CLI flags win last
    let settings = Config::load(opt.config.as_deref())?;
    GLOBAL_CONFIG.replace(settings);
    run_command(opt.command)
}

fn run_command(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::StartNode {
            address,
            policy,
            concurrent,
        } => {
            if let Some(address) = address {
                GLOBAL_CONFIG.set_node_addr(address);
            }
            if let Some(policy) = policy {
                GLOBAL_CONFIG.set_signature_policy(policy);
            }
            if concurrent {
                GLOBAL_CONFIG.set_concurrent_connections(true);
            }
            let settings = GLOBAL_CONFIG.settings();

            let dispatcher = RequestDispatcher::with_genesis(&settings)?;
            info!(
                "Genesis sealed at difficulty {}; signature policy: {}",
                settings.genesis_difficulty, settings.signature_policy
            );
            println!("Blockchain server running");

            let server = Server::new(dispatcher, settings.concurrent_connections);

            // first interrupt aborts the running seal; a second one, with no
            // mutation started in between, stops the node
            let cancel = server.cancellation_token();
            ctrlc::set_handler(move || {
                if cancel.is_cancelled() {
                    info!("Interrupted again, shutting down");
                    process::exit(130);
                }
                warn!("Interrupted: cancelling proof-of-work in progress (Ctrl-C again to stop)");
                cancel.cancel();
            })?;

            server
                .run(&settings.node_address)
                .map_err(|e| format!("Server error: {e}"))?
        }
        Command::Client { address, unsigned } => {
            let address = address.unwrap_or_else(|| GLOBAL_CONFIG.get_node_addr());
            let mut stdout = io::stdout();

            let wallet = if unsigned {
                None
            } else {
                let wallet = Wallet::new()?;
                display_keys(&mut stdout, &wallet)?;
                Some(wallet)
            };

            let mut client = LedgerClient::connect(&address, wallet.clone())?;
            info!("Connected to {address}");
            run_menu(
                &mut client,
                wallet.as_ref(),
                &mut io::stdin().lock(),
                &mut stdout,
            )?;
        }
        Command::Demo => {
            let settings = GLOBAL_CONFIG.settings();
            let mut dispatcher = RequestDispatcher::with_genesis(&settings)?;
            let wallet = Wallet::new()?;
            let mut stdout = io::stdout();
            display_keys(&mut stdout, &wallet)?;
            run_menu(
                &mut dispatcher,
                Some(&wallet),
                &mut io::stdin().lock(),
                &mut stdout,
            )?;
        }
        Command::Keygen => {
            let wallet = Wallet::new()?;
            display_keys(&mut io::stdout(), &wallet)?;
        }
    }
    Ok(())
}
