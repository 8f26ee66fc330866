use async_trait::async_trait;

use super::ChatProvider;
use crate::error::Result;
use crate::models::{ChatMessage, ChatRole};

struct Faq {
    keywords: &'static [&'static str],
    answer: &'static str,
}

const FAQ: &[Faq] = &[
    Faq {
        keywords: &["charge", "top up", "top-up", "충전"],
        answer: "You can charge OMNI Points from the Points page with a card. \
                 Preset amounts are 1,000 to 50,000 points, or enter a custom amount up to 1,000,000.",
    },
    Faq {
        keywords: &["mission", "eco", "미션"],
        answer: "Missions reward you with OMNI Points for eco-friendly travel, such as using public \
                 transportation or a reusable cup. Start a mission on the Missions page; photo missions \
                 are reviewed before points are awarded.",
    },
    Faq {
        keywords: &["duty", "tier", "reward", "면세"],
        answer: "Register your duty-free receipts to unlock rewards: Bronze at 300,000 KRW, \
                 Silver at 500,000 KRW and Gold at 1,000,000 KRW of purchases.",
    },
    Faq {
        keywords: &["qr", "barcode", "member code", "membership", "바코드"],
        answer: "Show your membership QR code or barcode from the My Code page at partner \
                 counters to earn and spend points.",
    },
    Faq {
        keywords: &["store", "partner", "shop", "매장"],
        answer: "Partner stores include duty-free shops, restaurants, retail, transport and \
                 culture venues. Use the Stores page to find partners near you.",
    },
    Faq {
        keywords: &["point", "earn", "spend", "포인트"],
        answer: "OMNI Points are earned on purchases at partner stores, by completing missions and \
                 by charging with a card. Spend them for shopping, transport and culture at partner stores.",
    },
    Faq {
        keywords: &["subway", "bus", "transport", "t-money", "교통"],
        answer: "Seoul's subway and buses accept T-money cards, sold at convenience stores. \
                 Public transport also counts toward the eco missions.",
    },
];

const FALLBACK: &str = "I'm the OMNIPASS assistant. I can help with OMNI Points, missions, \
                        duty-free rewards, partner stores and travel tips for South Korea. \
                        What would you like to know?";

/// Keyword FAQ used when no model provider is configured
pub struct OfflineProvider;

impl OfflineProvider {
    pub fn answer(question: &str) -> &'static str {
        let question = question.to_lowercase();
        FAQ.iter()
            .find(|faq| faq.keywords.iter().any(|keyword| question.contains(keyword)))
            .map(|faq| faq.answer)
            .unwrap_or(FALLBACK)
    }
}

#[async_trait]
impl ChatProvider for OfflineProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn complete(&self, _system: &str, messages: &[ChatMessage]) -> Result<String> {
        let question = messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        Ok(Self::answer(question).to_string())
    }
}
