// Prompt constants for transcript evaluation.

/// Categories the model must score, in order.
pub const FEEDBACK_CATEGORIES: [&str; 5] = [
    "Communication Skills",
    "Technical Knowledge",
    "Problem Solving",
    "Cultural Fit",
    "Confidence and Clarity",
];

/// System prompt for feedback generation: enforces JSON-only output.
pub const FEEDBACK_SYSTEM: &str = "You are a professional interviewer analyzing a mock interview. \
    Your task is to evaluate the candidate based on structured categories. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Feedback prompt template. Replace `{transcript}` before sending.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an AI interviewer analyzing a mock interview. Evaluate the candidate based on structured categories. Be thorough and detailed in your analysis. Don't be lenient with the candidate. If there are mistakes or areas for improvement, point them out.

Transcript:
{transcript}

Score the candidate from 0 to 100 in the following areas. Do not add categories other than the ones provided:
- Communication Skills: Clarity, articulation, structured responses.
- Technical Knowledge: Understanding of key concepts for the role.
- Problem Solving: Ability to analyze problems and propose solutions.
- Cultural Fit: Alignment with company values and job role.
- Confidence and Clarity: Confidence in responses, engagement, and clarity.

Return a JSON object with this EXACT schema:
{
  "totalScore": 72,
  "categoryScores": [
    {"name": "Communication Skills", "score": 75, "comment": "..."}
  ],
  "strengths": ["..."],
  "areasForImprovement": ["..."],
  "finalAssessment": "..."
}

`categoryScores` must contain exactly the five categories above, in that order."#;
