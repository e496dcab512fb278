pub const QUERY_WRITER_INSTRUCTIONS: &str = r#"Your goal is to generate a targeted web search query.

<CONTEXT>
Current date: {current_date}
Please ensure your queries account for the most current information available as of this date.
</CONTEXT>

<TOPIC>
{research_topic}
</TOPIC>

<FORMAT>
Format your response as a JSON object with ALL two of these exact keys:
   - "query": The actual search query string
   - "rationale": Brief explanation of why this query is relevant
</FORMAT>

<EXAMPLE>
Example output:
{
    "query": "machine learning transformer architecture explained",
    "rationale": "Understanding the fundamental structure of transformer models"
}
</EXAMPLE>

Provide your response in JSON format:"#;

pub const SUMMARIZER_INSTRUCTIONS: &str = r#"<GOAL>
Generate a high-quality summary of the provided context.
</GOAL>

<REQUIREMENTS>
When creating a NEW summary:
1. Highlight the most relevant information related to the user topic from the search results
2. Ensure a coherent flow of information

When EXTENDING an existing summary:
1. Read the existing summary and new search results carefully.
2. Compare the new information with the existing summary.
3. For each piece of new information:
    a. If it's related to existing points, integrate it into the relevant paragraph.
    b. If it's entirely new but relevant, add a new paragraph with a smooth transition.
    c. If it's not relevant to the user topic, skip it.
4. Keep every fact already present in the existing summary. Do not drop content.
5. Do not repeat facts that the existing summary already states.
</REQUIREMENTS>

<FORMATTING>
- Start directly with the updated summary, without preamble or titles. Do not use XML tags in the output.
</FORMATTING>"#;

pub const REFLECTION_INSTRUCTIONS: &str = r#"You are an expert research assistant analyzing a summary about {research_topic}.

<GOAL>
1. Identify knowledge gaps or areas that need deeper exploration
2. Generate a follow-up question that would help expand your understanding
3. Focus on technical details, implementation specifics, or emerging trends that weren't fully covered
</GOAL>

<REQUIREMENTS>
Ensure the follow-up question is self-contained and includes necessary context for web search.
If the summary already covers the topic thoroughly, return an empty string for both keys.
</REQUIREMENTS>

<FORMAT>
Format your response as a JSON object with these exact keys:
- knowledge_gap: Describe what information is missing or needs clarification
- follow_up_query: Write a specific question to address this gap
</FORMAT>

<EXAMPLE>
Example output:
{
    "knowledge_gap": "The summary lacks information about performance metrics and benchmarks",
    "follow_up_query": "What are typical performance benchmarks and metrics used to evaluate [specific technology]?"
}
</EXAMPLE>

Provide your analysis in JSON format:"#;

pub fn query_writer(topic: &str, current_date: &str) -> String {
    QUERY_WRITER_INSTRUCTIONS
        .replace("{current_date}", current_date)
        .replace("{research_topic}", topic)
}

/// User turn for the query writer. Carries the running summary once there is one.
pub fn query_request(running_summary: &str) -> String {
    if running_summary.trim().is_empty() {
        "Generate a query for web search:".to_string()
    } else {
        format!(
            "Here is what we already know:\n===\n{}\n===\n\
            Generate a query for web search that finds information not covered above:",
            running_summary
        )
    }
}

pub fn summarize_request(topic: &str, existing_summary: &str, new_context: &str) -> String {
    if existing_summary.trim().is_empty() {
        format!(
            "<Context>\n{}\n</Context>\n\n\
            Create a Summary using the Context on this topic:\n<User Input>\n{}\n</User Input>\n\n",
            new_context, topic
        )
    } else {
        format!(
            "<Existing Summary>\n{}\n</Existing Summary>\n\n\
            <New Context>\n{}\n</New Context>\n\n\
            Extend the Existing Summary with the New Context on this topic:\n<User Input>\n{}\n</User Input>\n\n\
            Keep everything the Existing Summary already says. Add only new, non-redundant information \
            and do not repeat facts that are already present.\n\n",
            existing_summary, new_context, topic
        )
    }
}

pub fn reflection(topic: &str) -> String {
    REFLECTION_INSTRUCTIONS.replace("{research_topic}", topic)
}

pub fn reflection_request(running_summary: &str) -> String {
    format!(
        "Reflect on our existing knowledge:\n===\n{}\n===\n\
        And now identify a knowledge gap and generate a follow-up web search query:",
        running_summary
    )
}

/// Today's date in the long form the query writer expects, e.g. "March 04, 2025".
pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}
