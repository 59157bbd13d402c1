use std::path::PathBuf;

use anyhow::{bail, Context as _};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use dw_ledger::{
    AuditReport, ChainReport, DurableCopyReport, LedgerDir, LedgerExport, LedgerStatistics,
    PageRequest, ProvenanceLedger, ProvenanceRecord, QueryFilter, QueryPage, RecordDescriptor,
    RecordMetadata, SortOrder, StructuralProofOracle, TimeRange,
};
use dw_server::handler::{CreateRecordBody, RecordResponse};
use dw_server::{DataWeaveServer, ServerConfig};
use dw_types::{OriginId, RecordId, RecordKind};

use crate::cli::*;
use crate::simulate::{find_miner, MinerSimulation, RunReport, DEFAULT_MINERS};

/// Optional per-directory configuration read by every command.
pub const CONFIG_FILE: &str = "dataweave.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let session = Session::new(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(&session, args).await,
        Command::Create(args) => cmd_create(&session, args).await,
        Command::Show(args) => cmd_show(&session, args),
        Command::Query(args) => cmd_query(&session, args),
        Command::Verify(args) => cmd_verify(&session, args).await,
        Command::Audit => cmd_audit(&session),
        Command::Stats => cmd_stats(&session),
        Command::Export(args) => cmd_export(&session, args),
        Command::Import(args) => cmd_import(&session, args),
        Command::Simulate(args) => cmd_simulate(&session, args).await,
    }
}

struct Session {
    data_dir: PathBuf,
    dir: LedgerDir,
    format: OutputFormat,
    config: ServerConfig,
}

impl Session {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.data_dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            ServerConfig::load(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?
        } else {
            ServerConfig::default()
        };
        Ok(Self {
            data_dir: cli.data_dir.clone(),
            dir: LedgerDir::new(&cli.data_dir),
            format: cli.format,
            config,
        })
    }

    fn open(&self) -> anyhow::Result<ProvenanceLedger> {
        let ledger = self
            .dir
            .open(self.config.ledger.clone())
            .with_context(|| format!("opening ledger in {}", self.data_dir.display()))?;
        Ok(ledger)
    }

    fn save(&self, ledger: &ProvenanceLedger) -> anyhow::Result<()> {
        self.dir.save(ledger)?;
        Ok(())
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_time(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not a record id"))
}

fn kind_label(kind: RecordKind) -> colored::ColoredString {
    match kind {
        RecordKind::Compute => kind.as_str().cyan(),
        RecordKind::Proof => kind.as_str().magenta(),
        RecordKind::Reasoning => kind.as_str().blue(),
    }
}

async fn cmd_serve(session: &Session, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match args.config {
        Some(path) => ServerConfig::load(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => session.config.clone(),
    };
    if config.data_dir.is_none() {
        config.data_dir = Some(session.data_dir.clone());
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "DataWeave server on {} (data: {})",
        config.bind_addr.to_string().bold(),
        session.data_dir.display()
    );
    DataWeaveServer::new(config)?.serve().await?;
    Ok(())
}

async fn cmd_create(session: &Session, args: CreateArgs) -> anyhow::Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(&args.payload).context("--payload is not valid JSON")?;

    let mut metadata = RecordMetadata::new(args.computation_type)
        .with_inputs(args.inputs)
        .with_outputs(args.outputs)
        .with_tags(args.tags);
    if let Some(version) = args.model_version {
        metadata = metadata.with_model_version(version);
    }
    if let Some(reasoning) = args.reasoning {
        metadata = metadata.with_reasoning(reasoning);
    }
    if let Some(raw) = args.custom_data {
        let data = serde_json::from_str(&raw).context("--custom-data is not valid JSON")?;
        metadata = metadata.with_custom_data(data);
    }

    let request = CreateRecordBody {
        kind: Some(args.kind.as_str().into()),
        origin_id: Some(args.origin),
        metadata: Some(serde_json::to_value(&metadata)?),
        payload: Some(payload),
    }
    .into_request()?;

    let ledger = session.open()?;
    let descriptor = ledger.create(request).await?;
    session.save(&ledger)?;

    if session.json() {
        return print_json(&descriptor);
    }
    println!("{} Record created", "✓".green().bold());
    print_descriptor(&descriptor);
    Ok(())
}

fn print_descriptor(d: &RecordDescriptor) {
    println!("  Id:      {}", d.record_id.to_string().yellow());
    println!("  Kind:    {}", kind_label(d.kind));
    println!("  Origin:  {}", d.origin_id.as_str().bold());
    println!("  Hash:    {}", d.content_hash.short_hex().dimmed());
    println!("  Durable: {}", d.durable_ref);
    match &d.prior_link {
        Some(prior) => println!("  Prior:   {}", prior.short_id().yellow()),
        None => println!("  Prior:   {}", "(first in chain)".dimmed()),
    }
    println!("  Created: {}", format_time(d.created_at));
}

fn cmd_show(session: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let ledger = session.open()?;
    let Some(record) = ledger.get_by_id(&id)? else {
        bail!("record {id} not found");
    };
    let chain = if args.chain {
        Some(ledger.verify_chain(&id)?)
    } else {
        None
    };

    if session.json() {
        return print_json(&RecordResponse { record, chain });
    }
    print_record(&record)?;
    if let Some(chain) = &chain {
        println!();
        print_chain(chain);
    }
    Ok(())
}

fn print_record(record: &ProvenanceRecord) -> anyhow::Result<()> {
    println!(
        "Record {} ({})",
        record.id.to_string().yellow().bold(),
        kind_label(record.kind)
    );
    println!("  Origin:      {}", record.origin_id.as_str().bold());
    println!("  Created:     {}", format_time(record.created_at));
    println!("  Computation: {}", record.metadata.computation_type);
    if let Some(version) = &record.metadata.model_version {
        println!("  Model:       {version}");
    }
    if !record.metadata.tags.is_empty() {
        let tags: Vec<&str> = record.metadata.tags.iter().map(String::as_str).collect();
        println!("  Tags:        {}", tags.join(", ").cyan());
    }
    println!("  Hash:        {}", record.content_hash.to_hex().dimmed());
    println!("  Durable:     {}", record.durable_ref);
    match record.prior_link() {
        Some(prior) => println!("  Prior:       {}", prior.to_string().yellow()),
        None => println!("  Prior:       {}", "(first in chain)".dimmed()),
    }
    println!("  Payload:     {}", serde_json::to_string(&record.payload)?);
    Ok(())
}

fn print_chain(report: &ChainReport) {
    let verdict = if report.valid {
        "valid".green().bold()
    } else {
        "BROKEN".red().bold()
    };
    println!(
        "Chain from {}: {} ({} link(s))",
        report.root.short_id().yellow(),
        verdict,
        report.depth()
    );
    for link in &report.trail {
        let mark = if link.valid { "✓".green() } else { "✗".red() };
        println!("  {} {}", mark, link.record_id);
        for violation in &link.violations {
            println!("      {}", serde_json::to_string(violation).unwrap_or_default().red());
        }
    }
    for missing in &report.missing_links {
        println!("  {} broken at {}", "!".red().bold(), missing);
    }
}

fn cmd_query(session: &Session, args: QueryArgs) -> anyhow::Result<()> {
    let time_range = match (args.since, args.until) {
        (None, None) => None,
        (start, end) => Some(TimeRange { start, end }),
    };
    let filter = QueryFilter {
        origin_id: args.origin.map(OriginId::new).transpose()?,
        kind: args.kind,
        time_range,
        tags: args.tags,
    };
    let page = PageRequest {
        offset: args.offset,
        limit: Some(args.limit),
        sort_by: args.sort_by.into(),
        sort_order: if args.asc { SortOrder::Asc } else { SortOrder::Desc },
    };

    let ledger = session.open()?;
    let result = ledger.query(&filter, &page)?;
    if session.json() {
        return print_json(&result);
    }
    print_page(&result, args.offset);
    Ok(())
}

fn print_page(page: &QueryPage, offset: usize) {
    if page.records.is_empty() {
        println!("No matching records.");
        return;
    }
    for record in &page.records {
        println!(
            "{}  {:<9}  {:<12}  {}  {}",
            record.id.short_id().yellow(),
            kind_label(record.kind),
            record.origin_id.as_str(),
            format_time(record.created_at).dimmed(),
            record.metadata.computation_type
        );
    }
    let more = if page.has_more { " (more available)" } else { "" };
    println!(
        "\nShowing {}-{} of {}{}",
        offset + 1,
        offset + page.records.len(),
        page.total,
        more
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOutcome {
    chain: ChainReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    durable: Option<DurableCopyReport>,
}

async fn cmd_verify(session: &Session, args: VerifyArgs) -> anyhow::Result<()> {
    let ledger = session.open()?;
    let roots = match &args.id {
        Some(raw) => vec![parse_id(raw)?],
        None => {
            let stats = ledger.statistics()?;
            let mut heads = Vec::new();
            for origin in stats.records_by_origin.keys() {
                heads.extend(ledger.head(origin)?);
            }
            heads
        }
    };

    let mut outcomes = Vec::with_capacity(roots.len());
    for root in roots {
        let chain = ledger.verify_chain(&root)?;
        let durable = if args.durable {
            ledger.verify_durable_copy(&root).await?
        } else {
            None
        };
        outcomes.push(VerifyOutcome { chain, durable });
    }

    let failed = outcomes
        .iter()
        .filter(|o| !o.chain.valid || o.durable.as_ref().is_some_and(|d| !d.matches))
        .count();

    if session.json() {
        print_json(&outcomes)?;
    } else if outcomes.is_empty() {
        println!("Ledger is empty; nothing to verify.");
    } else {
        for outcome in &outcomes {
            print_chain(&outcome.chain);
            if let Some(d) = &outcome.durable {
                let state = match (d.present, d.matches) {
                    (true, true) => "matches".green(),
                    (true, false) => "differs".red(),
                    (false, _) => "missing".red(),
                };
                println!("  Durable copy {}: {}", d.durable_ref, state);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} chain(s) failed verification", outcomes.len());
    }
    Ok(())
}

fn cmd_audit(session: &Session) -> anyhow::Result<()> {
    let report = session.open()?.audit()?;
    if session.json() {
        print_json(&report)?;
    } else {
        print_audit(&report);
    }
    if !report.is_consistent() {
        bail!("audit found {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn print_audit(report: &AuditReport) {
    if report.is_consistent() {
        println!(
            "{} {} records across {} origins, indexes consistent",
            "✓".green().bold(),
            report.record_count,
            report.origin_count
        );
        return;
    }
    println!("{} {} violation(s)", "✗".red().bold(), report.violations.len());
    for v in &report.violations {
        println!("  {} {:?}: {}", v.record_id.short_id().yellow(), v.kind, v.description);
    }
}

fn cmd_stats(session: &Session) -> anyhow::Result<()> {
    let stats = session.open()?.statistics()?;
    if session.json() {
        return print_json(&stats);
    }
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &LedgerStatistics) {
    println!("Records: {}", stats.total_records.to_string().bold());
    for kind in RecordKind::ALL {
        println!("  {:<10} {}", kind_label(kind), stats.count_for(kind));
    }
    println!("Origins: {}", stats.unique_origins.to_string().bold());
    for (origin, count) in &stats.records_by_origin {
        println!("  {:<12} {}", origin.as_str(), count);
    }
    if let Some(latest) = stats.latest_created_at {
        println!("Latest:  {}", format_time(latest));
    }
}

fn cmd_export(session: &Session, args: ExportArgs) -> anyhow::Result<()> {
    let export = session.open()?.export()?;
    let json = export.to_json_pretty()?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            if !session.json() {
                println!(
                    "{} Exported {} records to {}",
                    "✓".green().bold(),
                    export.records.len(),
                    path.display()
                );
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_import(session: &Session, args: ImportArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let export = LedgerExport::from_json(&raw).context("not a ledger export")?;

    let ledger = session.open()?;
    let report = ledger.import(export)?;
    session.save(&ledger)?;

    if session.json() {
        return print_json(&report);
    }
    println!(
        "{} Imported {} records across {} origins",
        "✓".green().bold(),
        report.record_count,
        report.origin_count
    );
    Ok(())
}

async fn cmd_simulate(session: &Session, args: SimulateArgs) -> anyhow::Result<()> {
    let profiles = match &args.miner {
        Some(id) => match find_miner(id) {
            Some(profile) => vec![*profile],
            None => bail!("unknown miner '{id}'"),
        },
        None => DEFAULT_MINERS.to_vec(),
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let ledger = session.open()?;
    let oracle = StructuralProofOracle;
    let mut simulation = MinerSimulation::new(&ledger, &oracle, rng);
    let mut reports: Vec<RunReport> = Vec::with_capacity(args.runs);
    for profile in profiles.iter().cycle().take(args.runs) {
        let report = simulation.run(profile).await?;
        if !session.json() {
            let verdict = if report.proof_verified {
                "proof verified".green()
            } else {
                "proof rejected".red()
            };
            println!(
                "{} {} {} ({})",
                "✓".green(),
                report.miner_id.bold(),
                report.computation_type.cyan(),
                verdict
            );
        }
        reports.push(report);
    }
    session.save(&ledger)?;

    if session.json() {
        return print_json(&reports);
    }
    println!(
        "Simulated {} run(s), {} records written",
        reports.len(),
        reports.len() * 3
    );
    Ok(())
}
