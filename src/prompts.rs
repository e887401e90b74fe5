//! System prompt for vision-model math recognition.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening a rule (e.g. environment
//!    handling) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spinning up a real VLM, making prompt regressions easy to catch.
//!
//! Callers can override it via [`crate::config::BatchConfig::recognition_prompt`];
//! the constant here is used only when no override is provided.

/// Default system prompt for extracting LaTeX from a formula image.
///
/// The model must return *only* LaTeX: the transcoding engine treats the
/// response as the canonical expression, so any prose or fencing the model
/// adds has to be stripped before use (see
/// [`crate::provider::clean_response`]).
pub const RECOGNITION_PROMPT: &str = r#"You are an expert mathematical OCR system. Analyze the image and extract all mathematical expressions accurately.

Follow these rules strictly:
1. Output ONLY LaTeX code without any explanations, markdown formatting, or additional text.
2. Use standard LaTeX notation and commands.
3. Preserve the exact structure, symbols, and spatial relationships of the mathematical expressions.
4. For multiple equations, output each on a new line.
5. Use appropriate LaTeX environments (equation, align, matrix, bmatrix, pmatrix, cases, etc.) as needed.
6. For fractions use \frac{}{}, for square roots use \sqrt{}, for nth roots use \sqrt[n]{}, for subscripts use _{}, for superscripts use ^{}, for Greek letters use their LaTeX commands, and for operators use proper LaTeX commands.
7. If any symbol is unclear or ambiguous, make your best educated guess based on mathematical context.
8. Preserve spacing and alignment as closely as possible to the original.

Return only the clean LaTeX code with no additional commentary, no markdown code blocks, no explanations."#;
