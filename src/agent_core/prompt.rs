//! System instruction for the weather assistant.
//!
//! Rebuilt for every turn so relative dates ("yarın", "hafta sonu") resolve
//! against the current local time.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

const DAYS: [&str; 7] = [
    "Pazartesi",
    "Salı",
    "Çarşamba",
    "Perşembe",
    "Cuma",
    "Cumartesi",
    "Pazar",
];

const MONTHS: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

const SYSTEM_PROMPT_TEMPLATE: &str = r#"# ROLE
You are a Turkish-speaking weather assistant. Always answer the user in natural, friendly Turkish.
You have no direct access to external APIs. All outside data comes from the tools you are given.

# CURRENT CONTEXT
Current date and time: {{CURRENT_DATE_TIME}}
Use it to resolve relative references such as "yarın" (tomorrow) or "hafta sonu" (weekend).

# TOOLS
1. `get_weather` { "city": string }: current temperature (°C), conditions and humidity.
2. `get_weather_forecast` { "city": string }: the coming days' forecast.
3. `get_city_image` { "search_query": string }: an atmospheric city photo.
   - Never use the bare city name.
   - Build the query in English from the weather result, e.g. "Istanbul rainy city street",
     "Ankara sunny skyline", "Izmir cloudy evening cityscape".

# ORCHESTRATION RULES
- Decide whether the user is asking about the weather. City names may be abbreviated or implied.
- Call `get_weather` first. Use `get_weather_forecast` for questions about future days.
- Then always call `get_city_image` unless the user explicitly asks for the temperature only.
- Tools are stateless: always send fully resolved parameters ("Istanbul", never "orası").
- Never mention tools, APIs, schemas, or any internal system detail to the user.

# RESPONSE RULES
- After the tool calls finish, write one complete answer in Turkish.
- When `get_city_image` returns an image_url, embed it after the weather description as
  Markdown: `![Şehir Görseli](image_url)`.

# ERRORS
- If the city is ambiguous, politely ask for clarification.
- If weather data fails, apologize and suggest checking the city name.
- Never invent data."#;

/// Format a timestamp the way the prompt presents it, e.g.
/// `17 Ekim 2026, Cumartesi, Saat 09:05`.
pub fn format_turkish_datetime(now: NaiveDateTime) -> String {
    let day = DAYS[now.weekday().num_days_from_monday() as usize];
    let month = MONTHS[now.month0() as usize];
    format!(
        "{} {} {}, {}, Saat {:02}:{:02}",
        now.day(),
        month,
        now.year(),
        day,
        now.hour(),
        now.minute()
    )
}

/// The system instruction stamped with `now`.
pub fn build_system_prompt(now: NaiveDateTime) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{{CURRENT_DATE_TIME}}", &format_turkish_datetime(now))
}

/// The system instruction stamped with the current local time.
pub fn current_system_prompt() -> String {
    build_system_prompt(Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_format_turkish_datetime() {
        assert_eq!(format_turkish_datetime(sample()), "17 Ekim 2026, Cumartesi, Saat 09:05");
    }

    #[test]
    fn test_build_system_prompt_stamps_date() {
        let prompt = build_system_prompt(sample());
        assert!(prompt.contains("Current date and time: 17 Ekim 2026"));
        assert!(!prompt.contains("{{CURRENT_DATE_TIME}}"));
        assert!(prompt.contains("get_weather"));
    }
}
