//! Word geometry from PDF content streams using lopdf.
//!
//! Glyph metrics are not resolved; every character is assumed to be half the
//! font size wide. That is precise enough for nearest-label lookups on the
//! fixed-layout reports this crate reads.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use tracing::{debug, trace};

use crate::error::PdfError;
use crate::models::config::PdfConfig;
use crate::report::spatial::{BoundingBox, GeometryProvider, Token};

/// Approximate glyph width as a fraction of the font size.
const CHAR_WIDTH_RATIO: f64 = 0.5;

/// TJ adjustments at or below this value (thousandths of a text unit) are word gaps.
const WORD_GAP_ADJUSTMENT: f64 = -250.0;

const IDENTITY_MATRIX: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// lopdf-backed [`GeometryProvider`].
#[derive(Debug, Clone)]
pub struct PdfGeometry {
    decrypt_empty_password: bool,
}

impl PdfGeometry {
    pub fn new() -> Self {
        Self {
            decrypt_empty_password: true,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self {
            decrypt_empty_password: config.decrypt_empty_password,
        }
    }
}

impl Default for PdfGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryProvider for PdfGeometry {
    fn page_tokens(&self, document: &[u8]) -> Result<Vec<Vec<Token>>, PdfError> {
        let mut doc = Document::load_mem(document).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() && (!self.decrypt_empty_password || doc.decrypt("").is_err()) {
            return Err(PdfError::Encrypted);
        }

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut result = Vec::with_capacity(pages.len());
        for (number, page_id) in pages {
            let raw = doc
                .get_page_content(page_id)
                .map_err(|e| PdfError::Geometry(format!("page {}: {}", number, e)))?;
            let content = Content::decode(&raw)
                .map_err(|e| PdfError::Geometry(format!("page {}: {}", number, e)))?;

            let tokens = tokens_from_operations(&content.operations);
            trace!("page {}: {} tokens", number, tokens.len());
            result.push(tokens);
        }

        debug!("Extracted word geometry for {} pages", result.len());
        Ok(result)
    }
}

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_size: f64,
    text_matrix: [f64; 6],
    line_matrix: [f64; 6],
    horiz_scale: f64,
    char_spacing: f64,
    word_spacing: f64,
    leading: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f64 {
        self.text_matrix[4]
    }

    fn y(&self) -> f64 {
        self.text_matrix[5]
    }

    fn effective_font_size(&self) -> f64 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn advance_x(&mut self, dx: f64) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f64, ty: f64) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }
}

/// Accumulates characters into whitespace-delimited word tokens.
#[derive(Debug, Default)]
struct WordCollector {
    tokens: Vec<Token>,
    word: String,
    left: f64,
    right: f64,
    bottom: f64,
    height: f64,
}

impl WordCollector {
    fn show(&mut self, text: &str, state: &mut TextState) {
        for ch in text.chars() {
            let width = state.font_size * CHAR_WIDTH_RATIO * state.horiz_scale;

            if ch.is_whitespace() {
                self.flush();
                state.advance_x(width + state.char_spacing + state.word_spacing);
                continue;
            }

            if self.word.is_empty() {
                self.left = state.x();
                self.bottom = state.y();
                self.height = state.effective_font_size();
            }
            self.word.push(ch);
            state.advance_x(width + state.char_spacing);
            self.right = state.x();
        }
    }

    fn flush(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.word);
        let bbox = BoundingBox::new(self.left, self.bottom, self.right, self.bottom + self.height);
        self.tokens.push(Token::new(text, bbox));
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush();
        self.tokens
    }
}

/// Walk decoded page operations and return word tokens with approximate boxes.
pub fn tokens_from_operations(operations: &[Operation]) -> Vec<Token> {
    let mut state = TextState::default();
    let mut words = WordCollector::default();

    for op in operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => {
                words.flush();
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => words.flush(),
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "Tm" => {
                let values: Vec<f64> = operands.iter().take(6).filter_map(number).collect();
                if let [a, b, c, d, e, f] = values[..] {
                    words.flush();
                    state.text_matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    words.flush();
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => {
                words.flush();
                state.next_line();
            }
            "TL" => set_number(operands, &mut state.leading),
            "Tc" => set_number(operands, &mut state.char_spacing),
            "Tw" => set_number(operands, &mut state.word_spacing),
            "Tz" => {
                if let Some(scale) = operands.first().and_then(number) {
                    state.horiz_scale = scale / 100.0;
                }
            }
            "Tj" => {
                if let Some(text) = operands.first().and_then(string) {
                    words.show(&text, &mut state);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    show_array(items, &mut words, &mut state);
                }
            }
            "'" => {
                words.flush();
                state.next_line();
                if let Some(text) = operands.first().and_then(string) {
                    words.show(&text, &mut state);
                }
            }
            "\"" => {
                if let [aw, ac, text] = operands {
                    words.flush();
                    if let Some(aw) = number(aw) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = number(ac) {
                        state.char_spacing = ac;
                    }
                    state.next_line();
                    if let Some(text) = string(text) {
                        words.show(&text, &mut state);
                    }
                }
            }
            _ => {}
        }
    }

    words.finish()
}

fn show_array(items: &[Object], words: &mut WordCollector, state: &mut TextState) {
    for item in items {
        if let Some(text) = string(item) {
            words.show(&text, state);
        } else if let Some(adjustment) = number(item) {
            if adjustment <= WORD_GAP_ADJUSTMENT {
                words.flush();
            }
            state.advance_x(-adjustment / 1000.0 * state.font_size * state.horiz_scale);
        }
    }
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(value) = operands.first().and_then(number) {
        *target = value;
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE when it carries a byte order mark, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
