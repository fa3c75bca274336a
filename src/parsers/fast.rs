use crate::parsers::Tag;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use std::cell::RefCell;

/// Collects candidate start tags straight from the token stream
#[derive(Default)]
struct CandidateSink {
    tags: RefCell<Vec<Tag>>,
}

impl CandidateSink {
    /// Tokenizer state an element switches to, mirroring the tree builder
    /// with scripting enabled
    fn content_state(name: &str) -> TokenSinkResult<()> {
        match name {
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "textarea" | "title" => TokenSinkResult::RawData(RawKind::Rcdata),
            "plaintext" => TokenSinkResult::Plaintext,
            _ => TokenSinkResult::Continue,
        }
    }
}

impl TokenSink for CandidateSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let Token::TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if tag.kind != TagKind::StartTag {
            return TokenSinkResult::Continue;
        }

        let candidate = Tag {
            name: tag.name.to_string(),
            attrs: tag
                .attrs
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect(),
        };
        if candidate.is_candidate() {
            self.tags.borrow_mut().push(candidate);
        }

        Self::content_state(&tag.name)
    }
}

/// Scans markup for candidate start tags without building a tree
///
/// Character references are decoded by the tokenizer. Comments and the
/// contents of raw text elements (`script`, `style`, `noscript`,
/// `textarea`...) never produce tags.
pub fn scan(markup: &str) -> Vec<Tag> {
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));

    let tokenizer = Tokenizer::new(CandidateSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let tags = tokenizer.sink.tags.take();
    ::log::debug!("Fast parser found {} candidate tags", tags.len());
    tags
}
