//! Endpoint prompt builders
//!
//! Each builder takes an already-validated payload and returns the
//! [`PromptSpec`] for it. Counts arrive resolved; defaults and range checks
//! live in the writing service.

use serde_json::Value;

use super::templates::{
    CHAPTER_PLANNER, NOVELIST, OUTLINER, PARAMETER_ADVISOR, SCENE_PARAGRAPH_WRITER, SCENE_WRITER,
    SECTION_SUMMARIZER, SUMMARY_ANALYST, SUMMARY_CLOSING,
};
use super::PromptSpec;
use crate::requests::{
    render_value, ChapterSuggestionsRequest, GenerationRequest, ParameterSuggestionRequest,
    PassageRewriteRequest, RawPromptRequest, SectionSummaryRequest, SentenceRewriteRequest,
    SummaryRewriteRequest,
};

/// Upper bound on paragraphs produced from one screenplay scene
pub const SCENE_PARAGRAPH_LIMIT: u32 = 10;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ============================================================================
// Chapters
// ============================================================================

/// Titles, synopses and acts for the next chapters
#[must_use]
pub fn chapter_suggestions(
    request: &ChapterSuggestionsRequest,
    number_of_chapters: i64,
    total_chapters: i64,
) -> PromptSpec {
    let chapters = pretty(&Value::Array(request.chapters.clone()));
    let user = format!(
        "Generate {number_of_chapters} new chapter outlines based on the following:

Story Parameters:
{parameters}

Existing Chapters:
{chapters}

Total Chapters in Story: {total_chapters}

Provide an array of {number_of_chapters} new chapter outlines, each with a title, a synopsis and \
the act it belongs to. The new chapters must follow the existing ones and lead towards a \
satisfying conclusion given the total number of chapters.",
        parameters = pretty(&request.parameters),
    );
    PromptSpec::json(CHAPTER_PLANNER, user)
}

/// One-line outlines for the next paragraphs of a chapter
#[must_use]
pub fn chapter_outlines(request: &GenerationRequest, count: i64) -> PromptSpec {
    let user = format!(
        "Generate {count} one-line outlines for the next paragraphs based on the following:

Context: {context}
Instruction (content to cover in the outlines): {instruction}

Ensure that:
1. Each outline relates directly to the instruction and context.
2. Together the outlines form a cohesive narrative sequence.
3. Character actions and developments are specific and meaningful.
4. New elements are consistent with the established story world.
5. The tone matches the narrative style of the context.

Provide an array of exactly {count} outlines, each an object with an 'outline' key. The response \
must be valid JSON.",
        context = request.context.pretty(),
        instruction = request.instruction(),
    );
    PromptSpec::json(OUTLINER, user)
}

/// Structured summary of the paragraphs of a section
#[must_use]
pub fn section_summary(request: &SectionSummaryRequest) -> PromptSpec {
    let user = format!(
        "Summarize the following paragraphs in JSON format as specified in the system message:
{paragraphs}

Relevant context:

Novel Parameters: `{parameters}`

Current Chapter Synopsis: `{synopsis}`

Previous Section Summary: `{previous}`

Capture all key elements without adding information or speculating about future events. In \
\"sequence\", compress the earlier events first, then append the new ones, keeping at most 5 \
entries in story order.",
        paragraphs = render_value(Some(&request.paragraphs)),
        parameters = request.context.field("parameters"),
        synopsis = request.context.field("synopsis"),
        previous = render_value(Some(&request.previous_summary)),
    );
    PromptSpec::json(SECTION_SUMMARIZER, user)
}

/// Paragraphs continuing the current chapter
#[must_use]
pub fn continue_chapter(system: &str, request: &GenerationRequest, count: i64) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Add {count} paragraph(s) to the current chapter based on the instruction `{instruction}` \
and this context, in priority order:

1. Screenplay (in sequence): `{screenplays}`

2. Current outline to expand: {outline}

3. Previous paragraph: `{previous}`

4. Synopsis for the entire chapter: {synopsis}

5. Overall story parameters: {parameters}

CRITICAL INSTRUCTIONS:
1. Generate EXACTLY {count} paragraph(s).
2. Follow the narrative, dialogue and actions of the screenplay when one is given.
3. Add plot points, character development or dialogue to fulfil the instruction.
4. Stay within the current outline. Do not write anything that goes beyond it.
5. Continue logically from the previous paragraph.

DIALOGUE:
- When the scene calls for it, make roughly 70% of the text dialogue.
- Let dialogue reveal personality, advance the plot and show rather than tell.
- Keep conversations natural and true to each character's voice.

STRICT BOUNDARIES:
- The next outline belongs to the following section. Do not include or allude to it: {next_outline}

FINAL VERIFICATION:
- Have you written exactly {count} paragraph(s)?
- Does the content follow the screenplay and stay inside the current outline?
- Does it fit seamlessly with the existing text?",
        instruction = request.instruction(),
        screenplays = context.field("screenplays"),
        outline = context.field("outline"),
        previous = context.field("previous_paragraph"),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
        next_outline = context.field("next_outline"),
    );
    PromptSpec::sentence(system, user)
}

/// Paragraphs inserted between two existing ones
#[must_use]
pub fn insert_paragraphs(system: &str, request: &GenerationRequest, count: i64) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Insert {count} paragraph(s) between the previous paragraph and the next paragraph:

1. Specific instruction to follow (can be empty): {instruction}
2. Previous paragraph (required): {prev}
3. Next paragraph (can be empty): {next}
4. Section summary (can be empty): {summary}
5. Chapter synopsis: {synopsis}
6. Overall story parameters: {parameters}

CRITICAL INSTRUCTIONS:
1. Follow the specific instruction (point 1) when writing the new paragraphs.
2. Make the {count} new paragraph(s) fit seamlessly between their neighbours.

STYLE:
- Match the tone and style of the surrounding paragraphs.
- Keep a similar dialogue-to-narrative ratio and consistent character voices.
- Do not contradict anything in the rest of the section.

FINAL VERIFICATION:
- Have you written exactly {count} paragraph(s)?
- Do they fit without creating continuity issues?

Return only the inserted paragraphs, without explanatory text or metadata.",
        instruction = request.instruction(),
        prev = context.field("prev"),
        next = context.field("next"),
        summary = context.field("summary"),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
    );
    PromptSpec::sentence(system, user)
}

/// Sentence-level edit list for one or more paragraphs
#[must_use]
pub fn rewrite_paragraph(
    system: &str,
    request: &GenerationRequest,
    paragraph: &str,
    count: i64,
) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Rewrite the following paragraph(s) within the context of their section and the story:

1. Chapter synopsis: {synopsis}
2. Overall story parameters: {parameters}
3. Previous paragraph: {previous}
4. Paragraph(s) to rewrite: {paragraph}
5. Next paragraph: {next}

CRITICAL INSTRUCTIONS:
1. Apply this instruction to the paragraph(s): `{instruction}`
2. Rewrite ONLY the given paragraph(s).
3. Write exactly {count} paragraph(s) that sit naturally between the previous and next paragraphs.
4. Do not repeat any part of the next paragraph.
5. Change only what the instruction requires. Leave unrelated sentences untouched.
6. When the instruction does not apply to a sentence, mark it \"no_change\".

OUTPUT FORMAT:
Return a JSON list with one object per sentence, in order, each in one of these forms:
1. {{\"action\": \"edit\", \"original_sentence\": \"<original>\", \"rewritten_sentence\": \"<rewritten>\"}}
2. {{\"action\": \"add\", \"rewritten_sentence\": \"<new sentence>\"}}
3. {{\"action\": \"remove\", \"original_sentence\": \"<removed sentence>\"}}
4. {{\"action\": \"no_change\", \"original_sentence\": \"<unchanged sentence>\"}}
5. {{\"action\": \"paragraph_break\"}}

Use \"paragraph_break\" between paragraphs. Return only the JSON list.",
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
        previous = context.field("previous_paragraph"),
        next = context.field("next_paragraph"),
        instruction = request.instruction(),
    );
    PromptSpec::json(system, user)
}

/// Replacement sentence for a running summary
#[must_use]
pub fn summary_sentence(request: &SummaryRewriteRequest) -> PromptSpec {
    let system = format!(
        "{SUMMARY_ANALYST}\n\nThe summary sentence generated should replace the following \
sentence in the full summary. Full Summary: `{full}`. Sentence to be replaced in the full \
summary: `{sentence}`\n\n{SUMMARY_CLOSING} The generated summary sentence should fit cohesively \
within the full summary.",
        full = request.full_summary,
        sentence = request.summary_sentence,
    );
    PromptSpec::sentence(system, format!("Current Paragraph: {}", request.paragraph))
}

// ============================================================================
// Scenes
// ============================================================================

const SCENE_CRAFT: &str = "- The scene should include:
  1. A vividly described setting with sensory details
  2. In-depth character descriptions and development
  3. Extensive dialogue that reveals personality and advances the plot
  4. Detailed actions and reactions, including subtle gestures and expressions
  5. Internal monologues that show the characters' thoughts and emotions
  6. A tone that matches the story's context";

/// A new screenplay scene
#[must_use]
pub fn new_scene(request: &GenerationRequest, count: i64) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Create a new scene in JSON format based on the instruction `{instruction}` and this \
context, in priority order:
1. Current screenplays: `{screenplay}`
2. Current section outline: `{outline}`
3. Previous section summary: `{summary}`
4. Synopsis for the entire chapter: `{synopsis}`
5. Overall story parameters: `{parameters}`

Instructions:
- Read the current screenplays, which are in sequence.
- Write an extensive, richly detailed scene that expands on the current section outline.
- When screenplays exist, write the next scene so it flows logically and tonally from them.
- Do not repeat anything from the \"sequence\" of the previous section summary; it has already happened.
- Stay consistent with the chapter synopsis and story parameters.
{SCENE_CRAFT}
- Aim for a minimum of {count} elements, balancing action, dialogue and internal monologue. Do not rush to finish the scene.
- Do not end the scene unless the instruction asks for it.
- If the instruction changes characters, time or location, update those fields as well.

Structure the output as one JSON object with title, setting, characters and elements as the \
system prompt describes.",
        instruction = request.instruction(),
        screenplay = context.field("current_screenplay"),
        outline = context.field("overall_outline"),
        summary = context.field("previous_summary"),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
    );
    PromptSpec::json(SCENE_WRITER, user)
}

/// The current scene rewritten per an instruction
#[must_use]
pub fn rewrite_scene(request: &GenerationRequest, count: i64) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Rewrite the screenplay scene in JSON format based on the instruction `{instruction}` \
and this context, in priority order:
1. Current screenplay to rewrite: `{screenplay}`
2. Previous section summary: `{summary}`
3. Synopsis for the entire chapter: `{synopsis}`
4. Overall story parameters: `{parameters}`

Instructions:
- Follow the instruction precisely. If it calls for rewriting the entire screenplay, do so.
- Follow on from the \"sequence\" of the previous section summary without repeating it.
- Stay consistent with the chapter synopsis and story parameters.
{SCENE_CRAFT}
- Aim for exactly {count} elements, balancing action, dialogue and internal monologue.
- Do not end the scene unless the instruction asks for it.
- If the instruction changes characters, time or location, update those fields as well.

Structure the output as one JSON object with title, setting, characters and elements as the \
system prompt describes.",
        instruction = request.instruction(),
        screenplay = context.field("current_screenplay"),
        summary = context.field("previous_summary"),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
    );
    PromptSpec::json(SCENE_WRITER, user)
}

/// Further elements for the current scene
#[must_use]
pub fn continue_scene(request: &GenerationRequest, count: i64) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Continue the screenplay scene in JSON format, adding scene elements only, based on the \
instruction `{instruction}` and this context, in priority order:
1. Current screenplay to continue: `{screenplay}`
2. Previous section summary: `{summary}`
3. Synopsis for the entire chapter: `{synopsis}`
4. Overall story parameters: `{parameters}`

Instructions:
- Continue the scene so it follows logically and tonally from the current screenplay.
- Do not repeat anything from the \"sequence\" of the previous section summary.
- Stay consistent with the chapter synopsis and story parameters.
{SCENE_CRAFT}
- Aim for exactly {count} elements, balancing action, dialogue and internal monologue.
- Conclude the scene only if the instruction asks for it.

Structure the output as JSON per the system prompt and generate scene elements only.",
        instruction = request.instruction(),
        screenplay = context.field("current_screenplay"),
        summary = context.field("previous_summary"),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
    );
    PromptSpec::json(SCENE_WRITER, user)
}

/// Novel prose for the current screenplay scene
#[must_use]
pub fn scene_paragraphs(request: &GenerationRequest) -> PromptSpec {
    let context = &request.context;
    let user = format!(
        "Transform the following screenplay scene into novel-style paragraphs. Represent every \
element of the screenplay in prose without altering or adding major plot points. Context:
1. Current screenplay: `{screenplay}`
2. Additional instructions: `{instruction}`
3. Synopsis for the entire chapter: `{synopsis}`
4. Overall story parameters: `{parameters}`

Instructions:
1. Open with a paragraph that sets the scene from the \"setting\" object.
2. Write at most {SCENE_PARAGRAPH_LIMIT} paragraphs. It is fine to leave the screenplay unfinished.
3. Introduce characters naturally, weaving in their \"character\" descriptions.
4. Turn \"action\" elements into vivid events, \"dialogue\" into speech true to the character, and \
\"internal_monologue\" into thoughts within the narrative.
5. Keep the scene's pacing and emotional tone.
6. Do not introduce new events or interactions.
7. Break paragraphs at natural shifts in the scene and avoid short paragraphs.",
        screenplay = context.field("current_screenplay"),
        instruction = request.instruction(),
        synopsis = context.field("synopsis"),
        parameters = context.field("parameters"),
    );
    PromptSpec::sentence(SCENE_PARAGRAPH_WRITER, user)
}

// ============================================================================
// Sentences, Parameters, Passages
// ============================================================================

/// Revised sentence, or a note that none is needed
#[must_use]
pub fn sentence_rewrite(request: &SentenceRewriteRequest) -> PromptSpec {
    let system = format!(
        "{NOVELIST}\nAnalyze the given paragraph and how the given sentence fits into it, then \
rewrite the sentence according to the instruction. Revise only if the instruction applies \
directly to the content of the original sentence. If it cannot be applied without adding \
information the original does not contain, make no changes. The rewritten sentence must fit the \
story parameters first, the chapter synopsis second and the surrounding paragraph third."
    );
    let user = format!(
        "Analyze the following sentence and instruction:
sentence: `{sentence}`
instruction: `{instruction}`
paragraph in which this sentence is part of: `{paragraph}`
chapter synopsis: `{synopsis}`
story parameters: `{parameters}`
If the instruction can be applied without adding information that wasn't in the original, \
provide a revised version. Otherwise return false.
Your output should be a valid JSON object with either a 'revised_sentence' key (if a revision was \
made) or a 'revision_needed' key set to false. Only return the JSON output.",
        sentence = request.sentence,
        instruction = request.instruction,
        paragraph = request.paragraph,
        synopsis = render_value(Some(&request.chapter_synopsis)),
        parameters = render_value(Some(&request.parameters)),
    );
    PromptSpec::json(system, user)
}

/// What to ask for, per parameter field
#[must_use]
pub fn field_request(field_type: &str) -> String {
    match field_type {
        "Title" => "suggest a creative and engaging title for the story.".to_string(),
        "Genre" => "recommend a suitable genre or subgenre for the story.".to_string(),
        "Premise" => "provide a compelling premise for the story.".to_string(),
        "synopsis" => "provide a concise synopsis for the given chapter based on the context in \
one sentence."
            .to_string(),
        "Time" => "suggest an interesting time period for the story to take place. (in 2-3 words)"
            .to_string(),
        "Place" => "recommend a unique and fitting location for the story. (in 4-5 words)"
            .to_string(),
        "character" => "generate a character profile with a name, an age and an occupation that \
fits the story's context. An example of output is: {\"name\": \"Elara Windrider\", \"age\": 28, \
\"occupation\": \"Sky Cartographer\"}"
            .to_string(),
        "chapters" => "generate a list of 3 chapters based on the context. Each chapter has a \
title and a synopsis of at most one sentence, and fits the story's context."
            .to_string(),
        "continue_chapter" => "suggest a one-sentence instruction for the novel writer on how \
the chapter should continue, focusing on plot, character development, tone or a mix of these."
            .to_string(),
        other => format!("provide a suggestion for the {other} of the story."),
    }
}

/// Suggestion for one story parameter
#[must_use]
pub fn parameter_suggestion(request: &ParameterSuggestionRequest) -> PromptSpec {
    let user = format!(
        "Based on the current value '{current}' and the following context: {context}, {ask}",
        current = render_value(Some(&request.current_value)),
        context = render_value(Some(&request.context)),
        ask = field_request(&request.field_type),
    );
    PromptSpec::json(PARAMETER_ADVISOR, user)
}

/// One-sentence summary of a paragraph
#[must_use]
pub fn paragraph_summary(paragraph: &str, previous_summary: Option<&str>) -> PromptSpec {
    let mut system = SUMMARY_ANALYST.to_string();
    if let Some(previous) = previous_summary.filter(|p| !p.trim().is_empty()) {
        system.push_str(&format!(
            "\n\nHere is the previous summary for reference: {previous}."
        ));
    }
    system.push_str("\n\n");
    system.push_str(SUMMARY_CLOSING);
    PromptSpec::sentence(system, format!("Current Paragraph: {paragraph}"))
}

/// The passage rewritten per an instruction
#[must_use]
pub fn passage_rewrite(request: &PassageRewriteRequest) -> PromptSpec {
    let system = format!(
        "{NOVELIST} Rewrite the following passage according to the instructions provided.

Original Passage: \"{passage}\"

Keep the essence, tone, style and intent of the original while incorporating the requested \
changes. Return only the rewritten passage, without introductory or explanatory text.",
        passage = request.passage,
    );
    let user = format!(
        "Original User Prompt: {}\n\nInstructions to update: {}",
        request.user_prompt, request.instruction
    );
    PromptSpec::sentence(system, user)
}

/// The original user prompt refined to match an instruction
#[must_use]
pub fn prompt_refinement(request: &PassageRewriteRequest) -> PromptSpec {
    let system = format!(
        "You are an expert prompt engineer, known for refining user prompts so they elicit more \
accurate and relevant responses. Rewrite the original user prompt to reflect the updated \
instructions while keeping its content and tone. Do not add information that is neither in the \
original prompt nor in the instructions. Return only the refined prompt, without introductory or \
explanatory text.\n\nOriginal User Prompt: \"{}\"",
        request.user_prompt
    );
    PromptSpec::sentence(system, format!("Instructions to update: {}", request.instruction))
}

/// Caller-supplied prompt and system prompt, passed through
#[must_use]
pub fn raw(request: &RawPromptRequest) -> PromptSpec {
    PromptSpec::sentence(
        request.system_prompt.clone().unwrap_or_default(),
        request.prompt.clone().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::SegmentMode;
    use serde_json::json;

    fn generation(context: Value, instruction: &str) -> GenerationRequest {
        GenerationRequest::new(context, instruction)
    }

    #[test]
    fn test_scene_builders_use_scene_writer_in_json_mode() {
        let request = generation(
            json!({"current_screenplay": "INT. BAR", "synopsis": "A meeting."}),
            "Add rain.",
        );
        for spec in [
            new_scene(&request, 10),
            rewrite_scene(&request, 10),
            continue_scene(&request, 10),
        ] {
            assert_eq!(spec.system, SCENE_WRITER);
            assert_eq!(spec.mode, SegmentMode::Json);
            assert!(spec.user.contains("`Add rain.`"));
            assert!(spec.user.contains("`INT. BAR`"));
            assert!(spec.user.contains("10 elements"));
        }
    }

    #[test]
    fn test_scene_paragraphs_are_prose() {
        let spec = scene_paragraphs(&generation(json!({}), ""));
        assert_eq!(spec.mode, SegmentMode::Sentence);
        assert_eq!(spec.system, SCENE_PARAGRAPH_WRITER);
        assert!(spec.user.contains("at most 10 paragraphs"));
    }

    #[test]
    fn test_chapter_builders_embed_context() {
        let request = generation(
            json!({"previous_paragraph": "She left.", "parameters": {"genre": "noir"}}),
            "Follow her.",
        );
        let spec = continue_chapter("assistant", &request, 2);
        assert_eq!(spec.system, "assistant");
        assert_eq!(spec.mode, SegmentMode::Sentence);
        assert!(spec.user.contains("`She left.`"));
        assert!(spec.user.contains(r#"{"genre":"noir"}"#));
        assert!(spec.user.contains("EXACTLY 2 paragraph(s)"));

        let rewrite = rewrite_paragraph("assistant", &request, "Old text.", 1);
        assert_eq!(rewrite.mode, SegmentMode::Json);
        assert!(rewrite.user.contains("Paragraph(s) to rewrite: Old text."));
        assert!(rewrite.user.contains(r#"{"action": "paragraph_break"}"#));
    }

    #[test]
    fn test_field_requests() {
        assert_eq!(
            field_request("Title"),
            "suggest a creative and engaging title for the story."
        );
        assert!(field_request("character").contains("Elara Windrider"));
        assert_eq!(
            field_request("Mood"),
            "provide a suggestion for the Mood of the story."
        );

        let spec = parameter_suggestion(&ParameterSuggestionRequest {
            field_type: "Genre".into(),
            current_value: json!("fantasy"),
            context: json!({"title": "Ash"}),
            mature: None,
        });
        assert_eq!(
            spec.user,
            "Based on the current value 'fantasy' and the following context: {\"title\":\"Ash\"}, \
recommend a suitable genre or subgenre for the story."
        );
    }

    #[test]
    fn test_paragraph_summary_references_previous() {
        let first = paragraph_summary("It rained.", None);
        assert!(!first.system.contains("previous summary"));
        assert!(first.system.ends_with(SUMMARY_CLOSING));
        assert_eq!(first.user, "Current Paragraph: It rained.");

        let next = paragraph_summary("It rained.", Some("A storm came."));
        assert!(next
            .system
            .contains("Here is the previous summary for reference: A storm came."));
    }

    #[test]
    fn test_passage_prompts() {
        let request = PassageRewriteRequest {
            passage: "The door creaked.".into(),
            instruction: "Make it louder.".into(),
            user_prompt: "Write a door.".into(),
            previous_summary: None,
            mature: None,
        };
        let rewrite = passage_rewrite(&request);
        assert!(rewrite.system.contains("Original Passage: \"The door creaked.\""));
        assert_eq!(
            rewrite.user,
            "Original User Prompt: Write a door.\n\nInstructions to update: Make it louder."
        );

        let refine = prompt_refinement(&request);
        assert!(refine.system.ends_with("Original User Prompt: \"Write a door.\""));
        assert_eq!(refine.user, "Instructions to update: Make it louder.");
    }

    #[test]
    fn test_chapter_suggestions_indent_inputs() {
        let request = ChapterSuggestionsRequest {
            chapters: vec![json!({"title": "One"})],
            parameters: json!({"genre": "noir"}),
            ..Default::default()
        };
        let spec = chapter_suggestions(&request, 3, 10);
        assert_eq!(spec.mode, SegmentMode::Json);
        assert!(spec.user.contains("\"genre\": \"noir\""));
        assert!(spec.user.contains("Total Chapters in Story: 10"));
    }
}
