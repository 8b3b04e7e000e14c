//! Built-in sample articles, the last link of the fetch chain.
//!
//! Two fixed articles per default topic. Topics outside the default set get
//! nothing.

use crate::models::{Article, ArticleStatus};

struct SampleArticle {
    title: &'static str,
    source: &'static str,
    url: &'static str,
    published_date: &'static str,
    content: &'static str,
    image: &'static str,
}

const fn sample(
    title: &'static str,
    source: &'static str,
    url: &'static str,
    published_date: &'static str,
    content: &'static str,
    image: &'static str,
) -> SampleArticle {
    SampleArticle {
        title,
        source,
        url,
        published_date,
        content,
        image,
    }
}

static SAMPLES: &[(&str, [SampleArticle; 2])] = &[
    (
        "Climate Action",
        [
            sample(
                "New Climate Bill Gains Bipartisan Support",
                "Climate News Network",
                "https://example.com/climate-bill",
                "2025-05-20T10:30:00",
                "A groundbreaking climate bill has gained surprising bipartisan support in Congress. The legislation aims to reduce carbon emissions by 50% by 2030 through investments in renewable energy infrastructure and carbon capture technology.",
                "climate_action_1.jpg",
            ),
            sample(
                "Renewable Energy Surpasses Coal for First Time",
                "Energy Today",
                "https://example.com/renewable-energy",
                "2025-05-19T14:45:00",
                "In a historic milestone, renewable energy sources have surpassed coal in total electricity generation for the first time in U.S. history. Solar and wind power now account for over 25% of the nation's electricity production.",
                "climate_action_2.jpg",
            ),
        ],
    ),
    (
        "Healthcare",
        [
            sample(
                "Universal Healthcare Plan Unveiled",
                "Health Policy Journal",
                "https://example.com/universal-healthcare",
                "2025-05-20T09:15:00",
                "A comprehensive universal healthcare plan has been unveiled by a coalition of lawmakers. The plan would provide coverage to all Americans while reducing overall healthcare costs through negotiated pricing and administrative efficiency.",
                "healthcare_1.jpg",
            ),
            sample(
                "Breakthrough in Cancer Treatment Shows Promise",
                "Medical Research Today",
                "https://example.com/cancer-treatment",
                "2025-05-18T11:30:00",
                "A new immunotherapy approach has shown remarkable results in clinical trials, with over 70% of patients experiencing complete remission of advanced-stage cancers. Researchers are calling it a potential paradigm shift in cancer treatment.",
                "healthcare_2.jpg",
            ),
        ],
    ),
    (
        "Economic Justice",
        [
            sample(
                "Minimum Wage Increase Boosts Economy",
                "Economic Times",
                "https://example.com/minimum-wage",
                "2025-05-20T08:45:00",
                "A recent study has found that states that increased their minimum wage saw significant economic growth and reduced poverty rates. Consumer spending increased by 12% in areas with higher minimum wages, driving local business growth.",
                "economic_justice_1.jpg",
            ),
            sample(
                "Wealth Tax Proposal Gains Momentum",
                "Financial Policy Review",
                "https://example.com/wealth-tax",
                "2025-05-17T16:20:00",
                "A proposed wealth tax on ultra-high net worth individuals is gaining momentum in Congress. The tax would apply to households with over $50 million in assets and could generate an estimated $3 trillion in revenue over ten years.",
                "economic_justice_2.jpg",
            ),
        ],
    ),
    (
        "Voting Rights",
        [
            sample(
                "Automatic Voter Registration Bill Passes",
                "Democracy Now",
                "https://example.com/voter-registration",
                "2025-05-20T13:10:00",
                "A bill establishing automatic voter registration has passed with strong support. The legislation will automatically register eligible citizens to vote when they interact with government agencies, potentially adding millions of new voters to the rolls.",
                "voting_rights_1.jpg",
            ),
            sample(
                "Election Security Measures Enhanced",
                "Electoral Integrity Watch",
                "https://example.com/election-security",
                "2025-05-16T10:45:00",
                "New election security measures have been implemented nationwide, including paper ballot backups, risk-limiting audits, and enhanced cybersecurity protocols. Experts say these changes will make the 2028 election the most secure in history.",
                "voting_rights_2.jpg",
            ),
        ],
    ),
    (
        "International News",
        [
            sample(
                "Global Climate Accord Reaches Milestone",
                "International Herald",
                "https://example.com/climate-accord",
                "2025-05-20T07:30:00",
                "The global climate accord has reached a significant milestone with 150 countries now having submitted enhanced emissions reduction targets. The collective commitments put the world on track to limit warming to 1.8°C above pre-industrial levels.",
                "international_news_1.jpg",
            ),
            sample(
                "Diplomatic Breakthrough in Middle East",
                "Global Affairs",
                "https://example.com/middle-east-diplomacy",
                "2025-05-15T14:20:00",
                "A major diplomatic breakthrough has been achieved in the Middle East with the signing of a comprehensive peace agreement. The accord includes provisions for economic cooperation, security arrangements, and cultural exchanges.",
                "international_news_2.jpg",
            ),
        ],
    ),
    (
        "AI News",
        [
            sample(
                "AI Ethics Framework Adopted Globally",
                "Tech Policy Today",
                "https://example.com/ai-ethics",
                "2025-05-20T11:45:00",
                "A comprehensive AI ethics framework has been adopted by major technology companies and governments worldwide. The framework establishes principles for transparency, accountability, and fairness in AI systems development and deployment.",
                "ai_news_1.jpg",
            ),
            sample(
                "Breakthrough in General AI Research",
                "AI Research Journal",
                "https://example.com/general-ai",
                "2025-05-14T09:30:00",
                "Researchers have announced a significant breakthrough in general artificial intelligence, demonstrating a system capable of transferring learning across multiple domains without specific training. The advance could accelerate progress toward more capable AI systems.",
                "ai_news_2.jpg",
            ),
        ],
    ),
];

/// Up to `limit` sample articles for `topic`, with image URLs under
/// `image_prefix`.
pub fn articles_for(topic: &str, limit: usize, image_prefix: &str) -> Vec<Article> {
    let prefix = image_prefix.trim_end_matches('/');
    SAMPLES
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, items)| {
            items
                .iter()
                .take(limit)
                .map(|s| Article {
                    id: 0,
                    title: s.title.to_string(),
                    source: s.source.to_string(),
                    url: s.url.to_string(),
                    published_date: s.published_date.to_string(),
                    content: s.content.to_string(),
                    topic: topic.to_string(),
                    image_url: Some(format!("{prefix}/{}", s.image)),
                    local_image_path: None,
                    status: ArticleStatus::New,
                })
                .collect()
        })
        .unwrap_or_default()
}
