// Fixed task prompts for the "improve my resume" and "job match" modes.

/// Instruction sent in improve mode. Suggestions come back one per line so they
/// can be exported to DOCX paragraph by paragraph.
pub const IMPROVE_TASK: &str = "Review this resume and suggest concrete improvements. \
    Cover structure, wording, quantified impact, and any missing sections. \
    Return the suggestions as a short list with one suggestion per line.";

/// Job match instruction. Replace `{role}` before sending.
pub const JOB_MATCH_TASK_TEMPLATE: &str = "Analyze how well this resume fits the role of {role}. \
    List the strongest matching qualifications, the most important gaps, \
    and finish with a fit rating out of 10.";
