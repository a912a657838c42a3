use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::QuizError;
use crate::quiz::{Answer, Question, QuestionKind};

pub const CHOOSE_ANSWER_PROMPT: &str = "Scegli la risposta";
pub const SKIP_LABEL: &str = "Passa";

/// Tags allowed through escaping, as they appear once escaped.
const ALLOWED_TAGS: [(&str, &str); 6] = [
    ("&lt;b&gt;", "<b>"),
    ("&lt;/b&gt;", "</b>"),
    ("&lt;code&gt;", "<code>"),
    ("&lt;/code&gt;", "</code>"),
    ("&lt;pre&gt;", "<pre>"),
    ("&lt;/pre&gt;", "</pre>"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest text message, in characters.
    pub message: usize,
    /// Longest photo caption, in characters.
    pub caption: usize,
}

impl Default for Limits {
    fn default() -> Self {
        // Telegram allows 4096 and 1024; escaping can grow the text on its way out.
        Self {
            message: 3000,
            caption: 715,
        }
    }
}

/// One outbound send.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Photo {
        image: Vec<u8>,
        caption: Option<String>,
    },
    Choices {
        prompt: String,
        labels: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    limits: Limits,
}

impl Renderer {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Builds every send for `question`, in order, ending with the answer
    /// keyboard. Images are decoded up front so a bad one aborts before
    /// anything reaches the chat.
    pub fn render(&self, question: &Question) -> Result<Vec<Outbound>, QuizError> {
        let mut plan = Vec::new();

        match question.kind() {
            QuestionKind::Text => {
                self.push_text(&mut plan, &escape_markup(&numbered_body(question)));
            }
            QuestionKind::ImageInQuestion => {
                let body = escape_markup(&numbered_body(question));
                self.push_photo(&mut plan, &question.image, &body)?;
            }
            QuestionKind::ImageInAnswer => {
                self.push_text(&mut plan, &escape_markup(&question.text));
                self.push_answers(&mut plan, &question.answers)?;
            }
            QuestionKind::ImageInQuestionAndAnswer => {
                self.push_photo(&mut plan, &question.image, &escape_markup(&question.text))?;
                self.push_answers(&mut plan, &question.answers)?;
            }
        }

        plan.push(choices(question.answers.len()));
        Ok(plan)
    }

    fn push_text(&self, plan: &mut Vec<Outbound>, text: &str) {
        plan.extend(
            split_chunks(text, self.limits.message)
                .into_iter()
                .map(|chunk| Outbound::Text(chunk.to_string())),
        );
    }

    fn push_photo(
        &self,
        plan: &mut Vec<Outbound>,
        encoded: &str,
        caption: &str,
    ) -> Result<(), QuizError> {
        let image = decode_image(encoded)?;
        if caption.chars().count() > self.limits.caption {
            plan.push(Outbound::Photo {
                image,
                caption: None,
            });
            self.push_text(plan, caption);
        } else {
            let caption = (!caption.is_empty()).then(|| caption.to_string());
            plan.push(Outbound::Photo { image, caption });
        }
        Ok(())
    }

    fn push_answers(&self, plan: &mut Vec<Outbound>, answers: &[Answer]) -> Result<(), QuizError> {
        for (i, answer) in answers.iter().enumerate() {
            if answer.has_image() {
                self.push_photo(plan, &answer.image, &format!("{})", i + 1))?;
            } else {
                self.push_text(plan, &escape_markup(&format!("{}) {}", i + 1, answer.text)));
            }
        }
        Ok(())
    }
}

fn numbered_body(question: &Question) -> String {
    let mut body = question.text.clone();
    for (i, answer) in question.answers.iter().enumerate() {
        body.push_str(&format!("\n\n{}. {}", i + 1, answer.text));
    }
    body
}

fn choices(count: usize) -> Outbound {
    let mut labels = (1..=count).map(|n| n.to_string()).collect::<Vec<_>>();
    labels.push(SKIP_LABEL.to_string());
    Outbound::Choices {
        prompt: CHOOSE_ANSWER_PROMPT.to_string(),
        labels,
    }
}

/// Accepts plain base64 as well as `data:` URLs, ignoring line breaks.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, QuizError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let compact = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    Ok(STANDARD.decode(compact)?)
}

/// Escapes text for HTML parse mode, keeping bold and code tags working.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    for (from, to) in ALLOWED_TAGS {
        escaped = escaped.replace(from, to);
    }
    escaped
}

/// Splits `text` into consecutive pieces of at most `max` characters.
///
/// A cut that would land inside an entity (`&lt;`) or a tag (`<b>`) is moved
/// back to just before it, unless that would leave the piece empty.
pub fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let cut = match rest.char_indices().nth(max) {
            None => rest.len(),
            Some((hard_cut, _)) => markup_safe_cut(rest, hard_cut),
        };
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

fn markup_safe_cut(text: &str, hard_cut: usize) -> usize {
    let head = &text[..hard_cut];
    let open = head.rfind(['&', '<']);
    let close = head.rfind([';', '>']);
    match open {
        Some(start) if start > 0 && close.map_or(true, |end| end < start) => start,
        _ => hard_cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::tests::question;

    // "img" in base64.
    const IMG: &str = "aW1n";

    fn small() -> Renderer {
        Renderer::new(Limits {
            message: 40,
            caption: 10,
        })
    }

    #[test]
    fn escapes_markup_except_allowed_tags() {
        assert_eq!(
            escape_markup("<b>x</b> < y > <i>z</i> <code>a</code> & b"),
            "<b>x</b> &lt; y &gt; &lt;i&gt;z&lt;/i&gt; <code>a</code> &amp; b"
        );
        assert_eq!(escape_markup("<pre>fn</pre>"), "<pre>fn</pre>");
    }

    #[test]
    fn chunks_respect_limit_and_reassemble() {
        let text = "àbcdefghijklmnopqrstuvwxyz".repeat(7);
        for max in [1, 5, 13, 3000] {
            let chunks = split_chunks(&text, max);
            assert!(chunks.iter().all(|c| c.chars().count() <= max));
            assert_eq!(chunks.concat(), text);
        }
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn chunks_do_not_split_entities() {
        let text = "abcdef&lt;gh";
        let chunks = split_chunks(text, 8);
        assert_eq!(chunks, vec!["abcdef", "&lt;gh"]);

        let tagged = "abcd<code>x</code>";
        let chunks = split_chunks(tagged, 7);
        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks.concat(), tagged);
    }

    #[test]
    fn text_question_is_one_numbered_body() {
        let plan = Renderer::default().render(&question("", &["", ""])).unwrap();

        assert_eq!(
            plan[0],
            Outbound::Text("Q\n\n1. answer 1\n\n2. answer 2".to_string())
        );
        assert_eq!(
            plan[1],
            Outbound::Choices {
                prompt: CHOOSE_ANSWER_PROMPT.to_string(),
                labels: vec!["1".into(), "2".into(), SKIP_LABEL.into()],
            }
        );
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn long_body_is_split_in_order() {
        let mut long = question("", &["", ""]);
        long.text = "x".repeat(100);
        let plan = small().render(&long).unwrap();

        let texts: Vec<_> = plan
            .iter()
            .filter_map(|item| match item {
                Outbound::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.len() > 1);
        assert!(texts.iter().all(|t| t.chars().count() <= 40));
        assert_eq!(texts.concat(), escape_markup(&numbered_body(&long)));
        assert!(matches!(plan.last(), Some(Outbound::Choices { .. })));
    }

    #[test]
    fn question_image_carries_short_caption() {
        let mut q = question(IMG, &["", ""]);
        q.answers.truncate(1);
        q.text = "Q".to_string();
        let plan = Renderer::new(Limits {
            message: 100,
            caption: 100,
        })
        .render(&q)
        .unwrap();

        assert_eq!(
            plan[0],
            Outbound::Photo {
                image: b"img".to_vec(),
                caption: Some("Q\n\n1. answer 1".to_string()),
            }
        );
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn long_caption_follows_the_photo() {
        let plan = small().render(&question(IMG, &["", ""])).unwrap();

        assert_eq!(
            plan[0],
            Outbound::Photo {
                image: b"img".to_vec(),
                caption: None,
            }
        );
        assert_eq!(
            plan[1],
            Outbound::Text("Q\n\n1. answer 1\n\n2. answer 2".to_string())
        );
    }

    #[test]
    fn answer_images_are_sent_one_by_one() {
        let plan = small().render(&question("", &["", IMG])).unwrap();

        assert_eq!(
            plan,
            vec![
                Outbound::Text("Q".to_string()),
                Outbound::Text("1) answer 1".to_string()),
                Outbound::Photo {
                    image: b"img".to_vec(),
                    caption: Some("2)".to_string()),
                },
                choices(2),
            ]
        );
    }

    #[test]
    fn both_images_put_prompt_under_photo() {
        let plan = small().render(&question(IMG, &[IMG, ""])).unwrap();

        assert_eq!(
            plan[0],
            Outbound::Photo {
                image: b"img".to_vec(),
                caption: Some("Q".to_string()),
            }
        );
        assert_eq!(
            plan[1],
            Outbound::Photo {
                image: b"img".to_vec(),
                caption: Some("1)".to_string()),
            }
        );
        assert_eq!(plan[2], Outbound::Text("2) answer 2".to_string()));
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn broken_image_aborts_rendering() {
        let err = small().render(&question("not base64!", &[""])).unwrap_err();
        assert!(matches!(err, QuizError::Image(_)));
    }

    #[test]
    fn decodes_data_urls_and_wrapped_base64() {
        assert_eq!(decode_image("data:image/png;base64,aW1n").unwrap(), b"img");
        assert_eq!(decode_image("aW\n1n").unwrap(), b"img");
    }
}
