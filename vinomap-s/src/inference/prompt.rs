pub const GREETING_PROMPT: &str = "Introduce yourself";

const REGION_PROMPT_PREFIX: &str = "Tell me about the wines and wine regions of ";
const REGION_PROMPT_SUFFIX: &str = ", Italy. Include information about popular grape varieties, notable wines, and wine-making traditions.";

/// Prompt asking about the wines of an Italian region. `region` is embedded verbatim.
pub fn region_prompt(region: &str) -> String {
    format!("{}{}{}", REGION_PROMPT_PREFIX, region, REGION_PROMPT_SUFFIX)
}
