use {
    anyhow::{Context, Result, bail},
    clap::Parser,
    rand::{SeedableRng, rngs::StdRng},
    smart_trading::{
        AccountStore, AssetClass, AssetQuote, BinanceQuoteSource, Cli, Command, DEMO, MarketData,
        MemoryAccountStore, MockQuoteSource, PriceStreamManager, ProfitAccrual, QuoteSnapshot,
        SqliteAccountStore, TradeRequest, TradingDesk, build_board, generate_chart_data,
        utils::{Clock, SystemClock, TimeUtils, epoch_ms_to_utc, format_duration},
    },
    std::{panic, sync::Arc},
    strum::IntoEnumIterator,
    tabled::{Table, Tabled, settings::Style},
};

#[derive(Tabled)]
struct BoardRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "24h")]
    change: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

impl From<&AssetQuote> for BoardRow {
    fn from(q: &AssetQuote) -> Self {
        Self {
            symbol: q.symbol.clone(),
            price: format!("{}", q.price),
            change: format!("{}{:.2}%", if q.is_positive { "+" } else { "" }, q.change_24h),
            trend: sparkline(&q.sparkline),
        }
    }
}

fn sparkline(series: &[f64]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let (lo, hi) = series
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = (hi - lo).max(f64::EPSILON);
    series
        .iter()
        .map(|v| BARS[(((v - lo) / span) * 7.0).round() as usize])
        .collect()
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn build_market(args: &Cli, clock: Arc<dyn Clock>) -> MarketData {
    let mock = match args.seed {
        Some(seed) => MockQuoteSource::seeded(seed, clock.clone()),
        None => MockQuoteSource::new(clock.clone()),
    };
    let market = MarketData::new(Arc::new(mock), clock.clone());
    if args.live_crypto {
        market.with_source(
            AssetClass::Crypto,
            Arc::new(BinanceQuoteSource::new(clock.clone())),
            clock,
        )
    } else {
        market
    }
}

fn print_board(snapshot: &QuoteSnapshot, rows: &[AssetQuote]) {
    let degraded = if snapshot.is_degraded() { " (degraded)" } else { "" };
    println!("{} [{}]{}", snapshot.class, snapshot.origin, degraded);
    let mut table = Table::new(rows.iter().map(BoardRow::from));
    table.with(Style::rounded());
    println!("{}\n", table);
}

async fn open_store(args: &Cli) -> Result<Arc<dyn AccountStore>> {
    Ok(match &args.db {
        Some(path) => Arc::new(
            SqliteAccountStore::new(path)
                .await
                .with_context(|| format!("Failed to open account store {}", path))?,
        ),
        None => Arc::new(MemoryAccountStore::new()),
    })
}

async fn run_quotes(args: &Cli, class: Option<AssetClass>, points: usize) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let market = build_market(args, clock);
    let mut rng = rng_from(args.seed);

    let classes: Vec<AssetClass> = match class {
        Some(class) => vec![class],
        None => AssetClass::iter().collect(),
    };
    let requests: Vec<(AssetClass, Vec<String>)> = classes
        .iter()
        .map(|&c| (c, DEMO.symbols(c).iter().map(|s| s.to_string()).collect()))
        .collect();

    for snapshot in market.fetch_all(&requests).await {
        let rows = build_board(&snapshot, points, &mut rng);
        print_board(&snapshot, &rows);
    }
    Ok(())
}

async fn run_stream(args: &Cli, class: AssetClass, symbols: &[String], ticks: usize) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let manager = PriceStreamManager::new(Arc::new(build_market(args, clock)));

    let symbols: Vec<String> = if symbols.is_empty() {
        DEMO.symbols(class).iter().map(|s| s.to_string()).collect()
    } else {
        symbols.to_vec()
    };

    let mut sub = manager.subscribe(class, &symbols);
    log::info!("Streaming {} [{}]", class, sub.symbols_key());

    for _ in 0..ticks {
        let Some(snapshot) = sub.recv().await else {
            bail!("Price stream closed");
        };
        let line = snapshot
            .quotes
            .iter()
            .map(|(s, q)| format!("{} {} ({:+.2}%)", s, q.price, q.change_percent))
            .collect::<Vec<_>>()
            .join("  ");
        println!("[{}] {}", snapshot.origin, line);
    }
    sub.close();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_trade(
    args: &Cli,
    amount: f64,
    timeframe: smart_trading::Timeframe,
    symbol: &str,
    direction: smart_trading::TradeDirection,
    deposit: f64,
    hours: i64,
) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let desk = Arc::new(TradingDesk::new(open_store(args).await?, clock.clone()));

    // 1. Demo account with a deposit
    let user = desk.create_user(DEMO.wallet_address).await?;
    if deposit > 0.0 {
        desk.create_deposit(&user.id, deposit, None).await?;
    }

    // 2. Open at the current quote
    let class = AssetClass::iter()
        .find(|c| DEMO.symbols(*c).iter().any(|s| s.eq_ignore_ascii_case(symbol)))
        .unwrap_or(AssetClass::Crypto);
    let market = build_market(args, clock.clone());
    let snapshot = market.fetch(class, &[symbol]).await;
    let open_price = snapshot
        .quotes
        .values()
        .next()
        .map(|q| q.price)
        .unwrap_or(0.0);

    let req = TradeRequest {
        symbol: symbol.to_string(),
        amount,
        timeframe,
        direction,
        open_price,
    };

    let receipt = match desk.validate_balance_and_create_trade(&user.id, &req).await {
        Ok(receipt) => receipt,
        Err(e) => {
            println!("Rejected [{}]: {}", e.code(), e);
            if e.suggests_deposit() {
                println!("Deposit funds and try again.");
            }
            return Ok(());
        }
    };
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    // 3. Project accrual
    let at = clock.now_ms() + hours * TimeUtils::MS_IN_H;
    let report = ProfitAccrual::new(desk.clone()).tick(at).await?;
    println!(
        "After {} (at {}): credited {:.2}, {} completed",
        format_duration(hours * TimeUtils::MS_IN_H),
        epoch_ms_to_utc(at),
        report.credited,
        report.completed
    );
    println!("{}", serde_json::to_string_pretty(&desk.portfolio(&user.id).await?)?);
    Ok(())
}

fn run_synth(seed: Option<u64>, price: f64, points: usize, down: bool) {
    let mut rng = rng_from(seed);
    let series = generate_chart_data(price, !down, points, &mut rng);
    println!("{}", sparkline(&series));
    for (i, p) in series.iter().enumerate() {
        println!("{:>4}  {}", i, p);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("smart_trading"), my_code_level)
        .init();

    let args = Cli::parse();

    match &args.command {
        Command::Quotes { class, points } => run_quotes(&args, *class, *points).await,
        Command::Stream {
            class,
            symbols,
            ticks,
        } => run_stream(&args, *class, symbols, *ticks).await,
        Command::Trade {
            amount,
            timeframe,
            symbol,
            direction,
            deposit,
            hours,
        } => {
            run_trade(
                &args, *amount, *timeframe, symbol, *direction, *deposit, *hours,
            )
            .await
        }
        Command::Synth { price, points, down } => {
            run_synth(args.seed, *price, *points, *down);
            Ok(())
        }
    }
}
