use clap::Parser;
use medrag_context::{Segmenter, SegmenterConfig, TermCategory};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Read};

/// A CLI tool to segment one page of guideline text into JSON chunks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Document name used in chunk ids.
    #[arg(short, long, default_value = "stdin")]
    doc: String,

    /// Page number of the input text.
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Words per parent chunk.
    #[arg(long, default_value_t = 1200)]
    parent_words: usize,

    /// Words per child chunk.
    #[arg(long, default_value_t = 300)]
    child_words: usize,

    /// Pages shorter than this many characters are skipped.
    #[arg(long, default_value_t = 50)]
    min_page_chars: usize,
}

#[derive(Serialize)]
struct Output<'a> {
    config: &'a SegmenterConfig,
    pattern_count: usize,
    chunks: &'a [medrag_context::Chunk],
    terms_by_category: BTreeMap<TermCategory, BTreeSet<String>>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let page_text = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = SegmenterConfig::default()
        .with_parent_window_words(args.parent_words)
        .with_child_window_words(args.child_words)
        .with_min_page_chars(args.min_page_chars);
    let segmenter = Segmenter::new(config)?;

    let chunks = segmenter.segment_page(&args.doc, args.page, &page_text);
    let output = Output {
        config: segmenter.config(),
        pattern_count: segmenter.extractor().pattern_count(),
        chunks: &chunks,
        terms_by_category: segmenter.extractor().extract_by_category(&page_text),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
