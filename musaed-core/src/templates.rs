//! Fixed reply texts.

use musaed_text::Language;

/// Validity-gate notice. Bilingual because the language of a message with no
/// letters cannot be told.
pub fn invalid_input(user_name: &str) -> String {
    format!(
        "عذراً يا {user_name}، أنا أفهم فقط اللغة العربية، الإنجليزية، والأرقام.\n\
         Sorry {user_name}, I only understand Arabic, English, and numbers."
    )
}

pub fn not_found(language: Language) -> &'static str {
    match language {
        Language::Arabic => {
            "عذراً، هذا السؤال جديد عليّ ولم أتمكن من فهمه جيداً. 🤖\n\
             يرجى ترك رقم هاتفك هنا للتواصل معك من قبل مدير الموقع والإجابة على استفسارك بدقة."
        }
        Language::English => {
            "Sorry, this question is new to me and I couldn't fully understand it. 🤖\n\
             Please leave your phone number here so the site manager can contact you with an accurate answer."
        }
    }
}

pub fn failure() -> &'static str {
    "عذراً، حدث خطأ غير متوقع. يرجى المحاولة مرة أخرى بعد قليل.\n\
     Sorry, something went wrong on our side. Please try again shortly."
}

/// Direct-address prefix put in front of answers.
pub fn greeting(language: Language, user_name: &str) -> String {
    match language {
        Language::Arabic => format!("يا {user_name}، "),
        Language::English => format!("Hey {user_name}, "),
    }
}

pub fn personalize(language: Language, user_name: &str, text: &str) -> String {
    let mut out = greeting(language, user_name);
    out.push_str(text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_names_user_in_both_languages() {
        let text = invalid_input("Mona");
        assert!(text.contains("يا Mona"));
        assert!(text.contains("Sorry Mona"));
    }

    #[test]
    fn personalize_prefixes_greeting() {
        assert_eq!(personalize(Language::English, "Sam", "Hi."), "Hey Sam, Hi.");
        assert_eq!(personalize(Language::Arabic, "سامي", "أهلاً"), "يا سامي، أهلاً");
    }
}
