//! Fixed instructions sent to the classifier.

pub const AGENT_PERSONA: &str = "You are an agent processing publicly available events to see if there's free food at these events and how likely.";

pub const COARSE_FILTER: &str = "Parse the event name and description and return only true/false and nothing else. true if the description suggests there's a good chance of free food, false otherwise. Event description doesn't need to mention food, still return true if the type of events may have free food.";

pub const DEEP_CHECK: &str = "Return how likely (very likely, likely, unlikely, very unlikely) followed by a comma and a one-line summarization of the event details mentioning food.";

pub const DIGEST: &str = "Summarize free-food opportunities and recommend events to attend. Based on these event summaries, provide a final summary of potential free food opportunities and their likelihood. Also, suggest some specific events to consider attending.";
