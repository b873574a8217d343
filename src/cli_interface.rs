// File: src/cli_interface.rs
// One-shot CLI commands over the lookup, attribution and price engines

use anyhow::Result;
use chrono::{TimeZone, Utc};

use crate::attribution::{fetch_holdings, WalletHoldings};
use crate::catalog::{join_blocks, BlockCatalog, MintTable};
use crate::data_models::{AppConfig, Block, BlockWithMint, Holdings, MintSearch};
use crate::lookup::LookupEngine;
use crate::pattern::{search_patterns, MintPattern};
use crate::price::PriceFeed;
use crate::source::HttpAdapter;
use crate::CliCommand;

/// Execute CLI mode operations
pub async fn run_cli_mode(config: &AppConfig, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Blocks { count } => show_blocks(config, count).await,
        CliCommand::Search { index } => show_mint_search(config, index).await,
        CliCommand::Wallet { address } => show_wallet(config, &address).await,
        CliCommand::Check { content, height } => show_pattern_check(&content, height),
        CliCommand::Price => show_market().await,
    }
}

/// List the newest catalog blocks with their cached mint status
async fn show_blocks(config: &AppConfig, count: usize) -> Result<()> {
    let catalog = BlockCatalog::load(&config.blocks_path).await?;
    let table = MintTable::load(&config.mints_path).await?;
    if catalog.is_empty() {
        println!("No blocks in the catalog.");
        return Ok(());
    }

    let rows = join_blocks(&catalog, &table);

    print_blocks_table(&rows[..count.min(rows.len())]);
    println!();
    println!(
        "📊 Catalog: {} blocks, {} with a located mint",
        catalog.len(),
        table.found_count()
    );
    Ok(())
}

/// Run the live lookup for one catalog index
async fn show_mint_search(config: &AppConfig, index: u64) -> Result<()> {
    let catalog = BlockCatalog::load(&config.blocks_path).await?;
    let engine = LookupEngine::from_config(config, HttpAdapter::new()?);
    let result = engine.find_mints_for_block(&catalog, index).await?;
    print_mint_search(&result);
    Ok(())
}

async fn show_wallet(config: &AppConfig, address: &str) -> Result<()> {
    let source = WalletHoldings::from_config(config, HttpAdapter::new()?);
    let holdings = fetch_holdings(&source, address).await;
    print_holdings(address, &holdings);
    Ok(())
}

/// Explain field by field why a payload is or is not a mint
fn show_pattern_check(content: &str, height: u64) -> Result<()> {
    let [compact, spaced] = search_patterns(height);
    println!("🔍 Checking payload against height {}", height);
    println!("   Search patterns: {}  |  {}", compact, spaced);

    match MintPattern::MAGIC.mismatches(content, height) {
        Err(e) => println!("❌ Not a mint: content is not valid JSON ({})", e),
        Ok(fields) if fields.is_empty() => println!("✅ Valid $magic mint for block {}", height),
        Ok(fields) => {
            println!("❌ Not a mint: {} field(s) differ", fields.len());
            for field in fields {
                let found = field
                    .found
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "<missing>".to_string());
                println!("   {:<5} expected \"{}\", found {}", field.field, field.expected, found);
            }
        }
    }
    Ok(())
}

async fn show_market() -> Result<()> {
    let snapshot = PriceFeed::new(HttpAdapter::new()?).market().await;
    println!("💰 BTC/USD: ${:.2} (via {})", snapshot.btc_price_usd, snapshot.source);
    println!(
        "📈 Market cap: ${:.0} ({} × {} BTC)",
        snapshot.market_cap_usd, snapshot.total_supply, snapshot.floor_price_btc
    );
    Ok(())
}

/// Print catalog rows in a formatted table
fn print_blocks_table(rows: &[BlockWithMint]) {
    println!();
    println!("╭─{:─<6}─┬─{:─<8}─┬─{:─<64}─┬─{:─<23}─┬─{:─<12}─╮", "", "", "", "", "");
    println!(
        "│ {:^6} │ {:^8} │ {:^64} │ {:^23} │ {:^12} │",
        "Index", "Height", "Hash", "Time", "Mint #"
    );
    println!("├─{:─<6}─┼─{:─<8}─┼─{:─<64}─┼─{:─<23}─┼─{:─<12}─┤", "", "", "", "", "");

    for row in rows {
        let mint = match &row.mint {
            Some(record) if record.found => record
                .inscription_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "found".to_string()),
            Some(_) => "─".to_string(),
            None => "?".to_string(),
        };
        println!(
            "│ {:>6} │ {:>8} │ {:<64} │ {:<23} │ {:>12} │",
            row.block.index,
            row.block.height,
            row.block.hash,
            format_timestamp(row.block.time),
            mint
        );
    }

    println!("╰─{:─<6}─┴─{:─<8}─┴─{:─<64}─┴─{:─<23}─┴─{:─<12}─╯", "", "", "", "", "");
}

fn print_block_header(block: &Block) {
    println!("╭─{:─<70}─╮", "");
    println!("│ Index: {:<6} Height: {:<10} Time: {:<33} │", block.index, block.height, format_timestamp(block.time));
    println!("│ Hash: {:<64} │", block.hash);
    println!("│       {:<64} │", magic_marker(block));
    println!("├─{:─<70}─┤", "");
}

fn print_mint_search(result: &MintSearch) {
    println!();
    println!("🔍 Mint Search");
    print_block_header(&result.block);

    let Some(first) = result.first() else {
        println!("│ No mint found yet for this block.{:<37}│", "");
        println!("╰─{:─<70}─╯", "");
        return;
    };

    for mint in &result.mints {
        let number = mint
            .inscription_number
            .map(|n| format!("#{}", n))
            .unwrap_or_else(|| "#?".to_string());
        let marker = if mint.inscription_id == first.inscription_id { "★" } else { " " };
        println!("│ {} {:<12} {:<55} │", marker, number, truncate(&mint.inscription_id, 55));
        println!("│     Owner:   {:<57} │", truncate(mint.current_owner.as_deref().unwrap_or("unknown"), 57));
        println!("│     Genesis: {:<57} │", truncate(mint.genesis_owner.as_deref().unwrap_or("unknown"), 57));
    }
    println!("╰─{:─<70}─╯", "");
    println!("📊 {} verified mint(s); ★ marks the first", result.count);
}

fn print_holdings(address: &str, holdings: &Holdings) {
    println!();
    println!("👛 Wallet {}", address);

    if holdings.count == 0 {
        println!("No $magic mints held by this address.");
        return;
    }

    println!("✨ {} magic mint(s) across {} block(s)", holdings.count, holdings.blocks.len());
    for block in &holdings.blocks {
        let record = holdings.cached_mints.iter().find(|m| m.index == block.index);
        let number = record
            .and_then(|r| r.inscription_number)
            .map(|n| format!("#{}", n))
            .unwrap_or_default();
        println!(
            "   • index {:>4}  height {:>7}  {}  {}",
            block.index,
            block.height,
            format_timestamp(block.time),
            number
        );
    }
}

/// Caret line marking every "21e8" run, aligned under the block hash
fn magic_marker(block: &Block) -> String {
    let mut marks = vec![' '; block.hash.len()];
    for start in block.magic_positions() {
        for slot in marks.iter_mut().skip(start).take(4) {
            *slot = '^';
        }
    }
    marks.into_iter().collect()
}

/// Format Unix timestamp to human-readable string
fn format_timestamp(timestamp: u64) -> String {
    Utc.timestamp_opt(timestamp as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("Invalid: {}", timestamp))
}

/// Shorten to at most `max_len` characters, ending with an ellipsis when cut
fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let kept: String = text.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with_hash(hash: &str) -> Block {
        Block {
            index: 0,
            height: 0,
            hash: hash.to_string(),
            time: 0,
        }
    }

    #[test]
    fn test_marker_sits_under_each_run() {
        assert_eq!(magic_marker(&block_with_hash("0021e8ff")), "  ^^^^  ");
        assert_eq!(magic_marker(&block_with_hash("21e821e8")), "^^^^^^^^");
    }

    #[test]
    fn test_marker_keeps_hash_width() {
        let hash = format!("0000{}", "21e8".repeat(15));
        assert_eq!(magic_marker(&block_with_hash(&hash)).chars().count(), 64);
        assert_eq!(magic_marker(&block_with_hash(&"0".repeat(64))).trim(), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn test_truncate_multibyte_owner() {
        let owner = format!("{}é-tail…", "a".repeat(55));
        let cut = truncate(&owner, 57);
        assert_eq!(cut.chars().count(), 57);
        assert_eq!(cut, format!("{}é…", "a".repeat(55)));
        assert_eq!(truncate("bc1pé", 5), "bc1pé");
    }
}
