//! Tantivy keyword index for BM25 scoring over a fixed corpus
use std::str::CharIndices;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, INDEXED, STORED,
};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::{
    doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term,
};
use thiserror::Error;

/// Name under which the whitespace + lowercase analyzer is registered
const TOKENIZER_NAME: &str = "whitespace_lower";

/// Writer heap for a single indexing thread (tantivy's per-thread minimum)
const WRITER_HEAP_BYTES: usize = 15_000_000;

#[derive(Error, Debug)]
pub enum KeywordIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),
}

/// In-memory tantivy index over one document collection
///
/// Documents are identified by their position in the collection, stored
/// alongside the text so scores can be mapped back after a search.
pub struct KeywordIndex {
    reader: IndexReader,
    position_field: Field,
    text_field: Field,
    num_docs: usize,
}

impl KeywordIndex {
    /// Build the index over `documents`, committing once
    pub fn build(documents: &[String]) -> Result<Self, KeywordIndexError> {
        let mut schema_builder = Schema::builder();

        let position_field = schema_builder.add_u64_field("position", INDEXED | STORED);
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER_NAME)
            .set_index_option(IndexRecordOption::WithFreqs);
        let text_field = schema_builder.add_text_field(
            "text",
            TextOptions::default().set_indexing_options(text_indexing),
        );

        let index = Index::create_in_ram(schema_builder.build());
        index.tokenizers().register(TOKENIZER_NAME, analyzer());

        // One thread keeps the whole corpus in a single segment
        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| KeywordIndexError::InitializationError(e.to_string()))?;

        for (position, text) in documents.iter().enumerate() {
            writer
                .add_document(doc!(
                    position_field => position as u64,
                    text_field => text.as_str(),
                ))
                .map_err(|e| KeywordIndexError::InsertError(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| KeywordIndexError::InsertError(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| KeywordIndexError::InitializationError(e.to_string()))?;

        Ok(Self {
            reader,
            position_field,
            text_field,
            num_docs: documents.len(),
        })
    }

    /// Score every document against `query`
    ///
    /// Returns one BM25 score per document position. Documents sharing no
    /// term with the query score 0, and so does every document when the
    /// query has no tokens.
    pub fn score_all(&self, query: &str) -> Result<Vec<f32>, KeywordIndexError> {
        let mut scores = vec![0.0; self.num_docs];

        let tokens = tokenize(query);
        if tokens.is_empty() || self.num_docs == 0 {
            return Ok(scores);
        }

        // Repeated query terms contribute once per occurrence
        let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.text_field, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let hits = searcher
            .search(&query, &TopDocs::with_limit(self.num_docs))
            .map_err(|e| KeywordIndexError::SearchError(e.to_string()))?;

        for (score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address)?;
            let position = stored
                .get_first(self.position_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| {
                    KeywordIndexError::SearchError("Missing or invalid position field".to_string())
                })? as usize;

            match scores.get_mut(position) {
                Some(slot) => *slot = score,
                None => {
                    return Err(KeywordIndexError::SearchError(format!(
                        "Position {} outside corpus of {} documents",
                        position, self.num_docs
                    )))
                }
            }
        }

        Ok(scores)
    }

    /// Get the number of documents in the index
    pub fn len(&self) -> usize {
        self.num_docs
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.num_docs == 0
    }

    /// Number of documents tantivy reports as searchable
    pub fn indexed_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

/// Splits on any Unicode whitespace, not only ASCII
///
/// tantivy's `WhitespaceTokenizer` keeps NBSP and ideographic spaces inside
/// tokens, which glues together column names copied out of spreadsheets.
#[derive(Clone, Default)]
pub struct UnicodeWhitespaceTokenizer {
    token: Token,
}

pub struct UnicodeWhitespaceTokenStream<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
    token: &'a mut Token,
}

impl Tokenizer for UnicodeWhitespaceTokenizer {
    type TokenStream<'a> = UnicodeWhitespaceTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        self.token.reset();
        UnicodeWhitespaceTokenStream {
            text,
            chars: text.char_indices(),
            token: &mut self.token,
        }
    }
}

impl UnicodeWhitespaceTokenStream<'_> {
    fn token_end(&mut self) -> usize {
        (&mut self.chars)
            .find(|(_, c)| c.is_whitespace())
            .map(|(offset, _)| offset)
            .unwrap_or(self.text.len())
    }
}

impl TokenStream for UnicodeWhitespaceTokenStream<'_> {
    fn advance(&mut self) -> bool {
        self.token.text.clear();
        self.token.position = self.token.position.wrapping_add(1);

        while let Some((offset_from, c)) = self.chars.next() {
            if c.is_whitespace() {
                continue;
            }
            let offset_to = self.token_end();
            self.token.offset_from = offset_from;
            self.token.offset_to = offset_to;
            self.token.text.push_str(&self.text[offset_from..offset_to]);
            return true;
        }
        false
    }

    fn token(&self) -> &Token {
        self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        self.token
    }
}

fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(UnicodeWhitespaceTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// Split text the way the keyword index does: on whitespace, lowercased
pub fn tokenize(text: &str) -> Vec<String> {
    let mut analyzer = analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}
