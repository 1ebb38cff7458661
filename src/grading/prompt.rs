//! Grading prompt construction

use crate::model::{Job, Submission};

pub const SYSTEM_PROMPT: &str = "You are an experienced career counselor who reviews student \
resumes and cover letters. You are honest, specific and encouraging. You always answer with a \
single JSON object and nothing else.";

const TRUNCATION_MARKER: &str = "\n[... document truncated ...]";

/// Cut `text` to at most `max_chars` characters on a char boundary.
///
/// Returns the text and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

/// Build the user prompt asking the model to grade `submission`.
pub fn build_prompt(submission: &Submission, job: Option<&Job>, max_chars: usize) -> String {
    let mut prompt = format!(
        "Evaluate the following student {kind}.\n\n\
        Respond with ONLY a JSON object of this exact shape:\n\
        {{\n  \
          \"score\": <integer 0-100>,\n  \
          \"summary\": \"<two or three sentence overall assessment>\",\n  \
          \"strengths\": [\"<short phrase>\", ...],\n  \
          \"weaknesses\": [\"<short phrase>\", ...],\n  \
          \"suggestions\": [\"<concrete action>\", ...]\n\
        }}\n\n\
        Keep each weakness to a short, reusable phrase (for example \"No quantified achievements\") \
        so weaknesses can be compared across students.\n\n\
        Title: {title}\n",
        kind = submission.kind.label(),
        title = submission.title,
    );

    if let Some(job) = job {
        prompt.push_str("\nThe document targets this posting; judge how well it fits:\n");
        prompt.push_str(&format!("Position: {} at {}\n", job.title, job.company));
        if let Some(location) = &job.location {
            prompt.push_str(&format!("Location: {}\n", location));
        }
        prompt.push_str(&format!("Description: {}\n", job.description));
        if !job.requirements.is_empty() {
            prompt.push_str("Requirements:\n");
            for requirement in &job.requirements {
                prompt.push_str(&format!("- {}\n", requirement));
            }
        }
    }

    let (content, truncated) = truncate_chars(&submission.content, max_chars);
    prompt.push_str("\n--- DOCUMENT START ---\n");
    prompt.push_str(content);
    if truncated {
        prompt.push_str(TRUNCATION_MARKER);
    }
    prompt.push_str("\n--- DOCUMENT END ---\n");

    prompt
}
