use clap::{Parser, Subcommand};
use hl_exchange_signer::config::Config;
use hl_exchange_signer::errors::{HyperliquidError, Result};
use hl_exchange_signer::exchange::client::current_nonce;
use hl_exchange_signer::exchange::Exchange;
use hl_exchange_signer::models::{
    CancelRequest, Cloid, Grouping, LimitSpec, MarketCloseParams, MarketOpenParams, OrderRequest,
    OrderType, OrderTypeSpec, Tif, Tpsl, TriggerSpec,
};
use hl_exchange_signer::signing::{Action, ActionSigner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hl-exchange-signer")]
#[command(version)]
#[command(about = "Sign and submit Hyperliquid exchange actions", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the signed request body instead of sending it
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the signer address
    Address,
    /// Place a limit or trigger order
    Order {
        #[arg(long)]
        coin: String,
        /// buy or sell
        #[arg(long)]
        side: String,
        #[arg(long)]
        px: f64,
        #[arg(long)]
        sz: f64,
        /// Time in force of a limit order, Gtc when neither this nor a trigger is given
        #[arg(long)]
        tif: Option<String>,
        /// Turns the order into a trigger order at this price
        #[arg(long)]
        trigger_px: Option<f64>,
        #[arg(long, default_value = "sl")]
        tpsl: String,
        /// Trigger executes as market
        #[arg(long)]
        trigger_market: bool,
        #[arg(long)]
        reduce_only: bool,
        #[arg(long)]
        cloid: Option<String>,
        /// Attach a freshly generated client order id
        #[arg(long, conflicts_with = "cloid")]
        random_cloid: bool,
    },
    /// Open a position with an IOC order at the mid price plus slippage
    MarketOpen {
        #[arg(long)]
        coin: String,
        #[arg(long)]
        side: String,
        #[arg(long)]
        sz: f64,
        #[arg(long)]
        px: Option<f64>,
        #[arg(long)]
        slippage: Option<f64>,
    },
    /// Close an open position with a reduce-only IOC order
    MarketClose {
        #[arg(long)]
        coin: String,
        #[arg(long)]
        sz: Option<f64>,
        #[arg(long)]
        px: Option<f64>,
        #[arg(long)]
        slippage: Option<f64>,
    },
    /// Cancel an order by exchange id
    Cancel {
        #[arg(long)]
        coin: String,
        #[arg(long)]
        oid: u64,
    },
    /// Set leverage for a coin
    Leverage {
        #[arg(long)]
        coin: String,
        #[arg(long)]
        leverage: u32,
        /// Use isolated instead of cross margin
        #[arg(long)]
        isolated: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::load_from_file(&args.config)?;
    config.expand_env_vars()?;

    init_logging(&config.logging.level)?;

    let signer = ActionSigner::new(&config.general.private_key)?;
    if let Command::Address = args.command {
        println!("{:?}", signer.address());
        return Ok(());
    }

    let mut exchange = Exchange::connect(config.general.api_url.clone(), signer)
        .await?
        .with_vault(config.general.vault()?)
        .with_account(config.general.account()?);
    exchange.set_expires_after(
        config
            .execution
            .expires_in_ms
            .map(|ms| current_nonce() + ms),
    );
    info!(
        "Signer {:?} on {:?}",
        exchange.address(),
        exchange.network()
    );

    if let Err(e) = run(&exchange, &config, args.command, args.dry_run).await {
        error!("Command failed: {}", e);
        return Err(e);
    }
    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(level: &str) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| HyperliquidError::ConfigError(format!("Failed to set logger: {}", e)))?;

    Ok(())
}

async fn run(exchange: &Exchange, config: &Config, command: Command, dry_run: bool) -> Result<()> {
    let default_slippage = config.execution.default_slippage;

    let action = match command {
        Command::Address => return Ok(()),
        Command::Order {
            coin,
            side,
            px,
            sz,
            tif,
            trigger_px,
            tpsl,
            trigger_market,
            reduce_only,
            cloid,
            random_cloid,
        } => {
            let limit = match (tif, trigger_px) {
                (Some(tif), _) => Some(LimitSpec {
                    tif: tif.parse::<Tif>()?,
                }),
                (None, None) => Some(LimitSpec { tif: Tif::Gtc }),
                (None, Some(_)) => None,
            };
            let trigger = trigger_px
                .map(|trigger_px| -> Result<TriggerSpec> {
                    Ok(TriggerSpec {
                        trigger_px,
                        is_market: trigger_market,
                        tpsl: tpsl.parse::<Tpsl>()?,
                    })
                })
                .transpose()?;
            let order_type = OrderType::try_from(OrderTypeSpec { limit, trigger })?;
            let cloid = match cloid {
                Some(c) => Some(c.parse::<Cloid>()?),
                None if random_cloid => Some(Cloid::random()),
                None => None,
            };
            let request = OrderRequest {
                coin,
                is_buy: parse_side(&side)?,
                limit_px: px,
                sz,
                reduce_only,
                order_type,
                cloid,
            };
            exchange.builder().orders(&[request], Grouping::Na, None)?
        }
        Command::MarketOpen {
            coin,
            side,
            sz,
            px,
            slippage,
        } => {
            let mid = match px {
                Some(px) => px,
                None => exchange.info().mid(&coin).await?,
            };
            let params = MarketOpenParams {
                coin,
                is_buy: parse_side(&side)?,
                sz,
                px,
                slippage: slippage.unwrap_or(default_slippage),
                cloid: None,
            };
            exchange.builder().market_open(&params, mid)?
        }
        Command::MarketClose {
            coin,
            sz,
            px,
            slippage,
        } => {
            let params = MarketCloseParams {
                coin,
                sz,
                px,
                slippage: slippage.unwrap_or(default_slippage),
                cloid: None,
            };
            let user_state = exchange.info().user_state(exchange.position_owner()).await?;
            let mid = match px {
                Some(px) => px,
                None => exchange.info().mid(&params.coin).await?,
            };
            exchange.builder().market_close(&params, &user_state, mid)?
        }
        Command::Cancel { coin, oid } => exchange.builder().cancel(&[CancelRequest { coin, oid }])?,
        Command::Leverage {
            coin,
            leverage,
            isolated,
        } => exchange.builder().update_leverage(&coin, !isolated, leverage)?,
    };

    submit(exchange, action, dry_run).await
}

async fn submit(exchange: &Exchange, action: Action, dry_run: bool) -> Result<()> {
    if dry_run {
        let signed = exchange.prepare(action, current_nonce())?;
        println!("{}", String::from_utf8_lossy(&signed.body));
        return Ok(());
    }

    let response = exchange.execute(action).await?;
    let statuses = hl_exchange_signer::exchange::client::check_response(response)?;
    for status in statuses {
        println!("{}", serde_json::to_string(&status)?);
    }
    Ok(())
}

fn parse_side(side: &str) -> Result<bool> {
    match side.to_lowercase().as_str() {
        "buy" | "b" | "long" => Ok(true),
        "sell" | "s" | "short" => Ok(false),
        _ => Err(HyperliquidError::ParseError(format!(
            "Invalid side: {}. Must be 'buy' or 'sell'",
            side
        ))),
    }
}
