//! Transcription and caption generation
//!
//! Both are traits so a real speech-to-text or NLP backend can be dropped in
//! through `AppState`. The only implementations shipped are inert mocks that
//! return fixed, watermarked text.

use crate::model::{CaptionRequest, Captions, Tone, Transcript, UploadedFile};

/// Prefix stamped on every piece of mock output
pub const WATERMARK: &str = "MOCK: ";

/// Suffix stamped on every generated caption
pub const WATERMARK_SUFFIX: &str = " [mock]";

/// Effective slice length is always clamped into this range,
/// even though `maxLen` itself accepts 10..=500
pub const SLICE_MIN_CHARS: u32 = 20;
pub const SLICE_MAX_CHARS: u32 = 180;

/// Fixed transcript text returned by `MockTranscriber`
pub const MOCK_TRANSCRIPT: &str =
    "MOCK: This is a placeholder transcript. No audio was decoded for this request.";

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, file: &UploadedFile) -> Transcript;
}

pub trait CaptionGenerator: Send + Sync {
    fn generate(&self, request: &CaptionRequest) -> Captions;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockTranscriber;

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _file: &UploadedFile) -> Transcript {
        Transcript {
            text: MOCK_TRANSCRIPT.to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockCaptionGenerator;

impl CaptionGenerator for MockCaptionGenerator {
    fn generate(&self, request: &CaptionRequest) -> Captions {
        let slice = transcript_slice(&request.transcript, request.max_len);
        let core = format!("{WATERMARK}{slice}");

        // Tone only swaps the template family; the core is identical everywhere.
        let (tweet, instagram, youtube) = match request.tone {
            Tone::Default => (
                format!("{core} #captions"),
                format!("{core}\n\n#captions #creator"),
                format!("{core}\n\nWatch the full video for more."),
            ),
            Tone::Professional => (
                format!("{core} | Key takeaways in thread."),
                format!("{core}\n\nInsights worth sharing. #leadership #growth"),
                format!("{core}\n\nIn this video we break down the essentials."),
            ),
            Tone::Casual => (
                format!("{core} :) #vibes"),
                format!("{core}\n\nJust sharing some thoughts #dailylife"),
                format!("{core}\n\nHang out with us in this one!"),
            ),
            Tone::Funny => (
                format!("{core} (no, really) #lol"),
                format!("{core}\n\nCaption so good it needs a caption #funny"),
                format!("{core}\n\nWarning: may contain puns."),
            ),
        };

        Captions {
            tweet: format!("{tweet}{WATERMARK_SUFFIX}"),
            instagram: format!("{instagram}{WATERMARK_SUFFIX}"),
            youtube: format!("{youtube}{WATERMARK_SUFFIX}"),
        }
    }
}

/// `clamp(max_len, 20, 180)`
pub fn effective_slice_len(max_len: u32) -> usize {
    max_len.clamp(SLICE_MIN_CHARS, SLICE_MAX_CHARS) as usize
}

/// Collapses whitespace runs, trims, then truncates to the effective length
/// (in characters)
pub fn transcript_slice(transcript: &str, max_len: u32) -> String {
    let normalized = transcript.split_whitespace().collect::<Vec<_>>().join(" ");
    normalized.chars().take(effective_slice_len(max_len)).collect()
}
