use chrono::NaiveDate;

use crate::corpus::DocumentStore;
use crate::llm::embeddings::{EmbedPurpose, Embedder};
use crate::models::{Category, Document};
use crate::search::lexical::LexicalIndex;
use crate::search::vector::{VectorBackend, VectorMetadata};

fn doc(
    id: &str,
    title: &str,
    body: &str,
    category: Category,
    country: &str,
    source: &str,
    updated: (i32, u32, u32),
    reliability: f32,
) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        body: body.trim().to_string(),
        category,
        country: country.to_string(),
        source: Some(source.to_string()),
        last_updated: NaiveDate::from_ymd_opt(updated.0, updated.1, updated.2),
        reliability,
    }
}

/// Curated reference corpus, indexed once at startup.
pub fn seed_documents() -> Vec<Document> {
    vec![
        doc(
            "visa-jp-tourist",
            "Japan Tourist Visa Requirements for Indian Citizens",
            "Indian citizens need a tourist visa for Japan. Applications go through VFS Global \
             or the Japanese embassy with a passport valid for six months, a completed form with \
             photograph, confirmed round-trip flights, hotel bookings for the full stay, and bank \
             statements covering the last three months. Processing takes five to seven business \
             days and the visa is typically valid for three months with stays of up to 90 days. \
             There is no visa on arrival for Indian passport holders.",
            Category::Visa,
            "Japan",
            "Japanese Embassy India",
            (2024, 11, 1),
            0.95,
        ),
        doc(
            "visa-us-b1b2",
            "USA B1/B2 Visitor Visa Requirements",
            "Tourism and business visits to the United States require a B1/B2 visa with a \
             mandatory in-person interview at the embassy or a consulate. Applicants submit the \
             DS-160 form, a passport valid six months beyond the stay, proof of funds, and \
             employment documents. Processing averages three to five weeks. The visa is usually \
             issued for ten years with stays up to 180 days per visit, and issuance does not \
             guarantee entry at the border.",
            Category::Visa,
            "USA",
            "US Embassy India",
            (2024, 10, 15),
            0.98,
        ),
        doc(
            "visa-uk-visitor",
            "UK Standard Visitor Visa Essentials",
            "A Standard Visitor visa covers tourism, business meetings, and family visits to the \
             United Kingdom for up to six months. The online application must be backed by six \
             months of bank statements, travel itinerary, and accommodation details. Standard \
             processing takes about three weeks; priority services are available. Overstaying \
             even briefly can affect future applications.",
            Category::Visa,
            "UK",
            "UK Home Office",
            (2024, 9, 20),
            0.93,
        ),
        doc(
            "culture-jp-etiquette",
            "Japanese Etiquette Basics for Visitors",
            "Bowing is the standard greeting; a slight nod suffices for visitors. Shoes come off \
             at homes, temples, and many traditional restaurants. Tipping is not practiced and \
             can cause confusion. Speaking loudly on trains is frowned upon, and phone calls in \
             carriages are considered rude. Tattoos may bar entry to some hot springs, so cover \
             them or ask ahead.",
            Category::Culture,
            "Japan",
            "Japan National Tourism Organization",
            (2024, 8, 12),
            0.9,
        ),
        doc(
            "culture-uae-customs",
            "UAE Cultural Norms and Ramadan Conduct",
            "Dress modestly in public places; shoulders and knees should be covered in malls and \
             government buildings. Public displays of affection are frowned upon and can attract \
             fines. During Ramadan, eating, drinking, or smoking in public during daylight hours \
             is disrespectful and in some emirates unlawful. Always ask permission before \
             photographing people, especially women.",
            Category::Culture,
            "UAE",
            "UAE Government Portal",
            (2024, 7, 30),
            0.92,
        ),
        doc(
            "law-uae-conduct",
            "UAE Laws Visitors Are Most Often Caught By",
            "Alcohol may only be consumed in licensed venues and being drunk in public is an \
             offence. Zero tolerance applies to drugs; some common prescription medicines such \
             as codeine require prior approval. Swearing, rude gestures, and offensive social \
             media posts can lead to prosecution. Photography of government buildings and \
             accident scenes is prohibited.",
            Category::Law,
            "UAE",
            "UAE Ministry of Interior",
            (2024, 10, 5),
            0.95,
        ),
        doc(
            "law-us-basics",
            "USA Laws and Rules Travelers Should Know",
            "Laws vary significantly by state: drinking alcohol in public is illegal in most \
             places, and the drinking age is 21 everywhere. Jaywalking is ticketed in many \
             cities. Always carry identification. Tipping 15 to 20 percent in restaurants is a \
             strong social norm though not a law. Cannabis remains federally illegal even where \
             states permit it, which matters at borders and airports.",
            Category::Law,
            "USA",
            "US State Department",
            (2024, 6, 18),
            0.9,
        ),
        doc(
            "law-jp-rules",
            "Local Laws in Japan: What Is Actually Enforced",
            "Carry your passport at all times; police may ask for it and a photocopy is not \
             sufficient. Most recreational drugs carry severe penalties including deportation \
             and prison. Smoking on the street is banned in many city districts outside \
             designated areas. Drinking alcohol in public is legal, but drunk cycling is a \
             criminal offence.",
            Category::Law,
            "Japan",
            "Japan National Police Agency",
            (2024, 9, 2),
            0.94,
        ),
        doc(
            "safety-jp-general",
            "Safety and Emergencies in Japan",
            "Japan is among the safest destinations worldwide; violent crime is rare. The main \
             risks are natural: earthquakes, typhoons between August and October, and heatstroke \
             in summer. Dial 110 for police and 119 for fire or ambulance. Follow hotel and \
             municipal guidance during earthquake alerts, and keep your phone's emergency alerts \
             enabled.",
            Category::Safety,
            "Japan",
            "Japan Meteorological Agency",
            (2024, 11, 20),
            0.92,
        ),
        doc(
            "safety-us-urban",
            "Staying Safe in US Cities",
            "Safety varies by neighborhood more than by city; check local guidance for areas to \
             avoid after dark. Call 911 for any emergency. Petty theft from rental cars is \
             common in tourist areas, so keep valuables out of sight. Healthcare is excellent \
             but expensive; travel insurance with medical cover is strongly recommended.",
            Category::Safety,
            "USA",
            "US Travel Advisory",
            (2024, 5, 9),
            0.88,
        ),
        doc(
            "safety-uae-heat",
            "UAE Heat Safety and Emergency Contacts",
            "Summer temperatures regularly exceed 45 degrees Celsius; avoid outdoor activity \
             between 11am and 4pm from June to September and drink water constantly. Dial 999 \
             for police and 998 for ambulance. Desert excursions should only be done with \
             licensed operators, and swimming outside flagged beach zones is dangerous due to \
             rip currents.",
            Category::Safety,
            "UAE",
            "UAE Government Portal",
            (2024, 8, 1),
            0.9,
        ),
    ]
}

/// Embed and index the seed corpus. Runs before the server accepts
/// traffic; the embedding batch is atomic, so a provider failure leaves
/// every store untouched.
pub async fn seed_corpus(
    corpus: &DocumentStore,
    lexical: &LexicalIndex,
    vectors: &dyn VectorBackend,
    embedder: &dyn Embedder,
) -> anyhow::Result<usize> {
    let docs = seed_documents();

    let texts: Vec<String> = docs
        .iter()
        .map(|d| format!("{}\n{}", d.title, d.body))
        .collect();
    let embeddings = embedder.embed_batch(&texts, EmbedPurpose::Document).await?;

    lexical.clear();
    for (doc, embedding) in docs.iter().zip(embeddings) {
        vectors.upsert(
            &doc.id,
            embedding,
            VectorMetadata {
                country: doc.country.clone(),
                category: doc.category,
            },
        )?;
        lexical.index_document(doc);
    }

    let count = docs.len();
    corpus.replace_all(docs);
    tracing::info!(count, "Seed corpus indexed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::search::vector::VectorStore;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct ZeroEmbedder {
        dim: usize,
    }

    #[async_trait]
    impl Embedder for ZeroEmbedder {
        async fn embed(
            &self,
            _text: &str,
            _purpose: EmbedPurpose,
        ) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.1; self.dim])
        }

        async fn embed_batch(
            &self,
            texts: &[String],
            _purpose: EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![0.1; self.dim]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(
            &self,
            _text: &str,
            _purpose: EmbedPurpose,
        ) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Provider(anyhow::anyhow!("provider down")))
        }

        async fn embed_batch(
            &self,
            _texts: &[String],
            _purpose: EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Provider(anyhow::anyhow!("provider down")))
        }
    }

    #[test]
    fn test_seed_documents_have_unique_ids() {
        let docs = seed_documents();
        let ids: HashSet<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), docs.len());
    }

    #[test]
    fn test_seed_documents_cover_every_category() {
        let docs = seed_documents();
        for category in [
            Category::Visa,
            Category::Culture,
            Category::Law,
            Category::Safety,
        ] {
            assert!(
                docs.iter().any(|d| d.category == category),
                "missing {category:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_seeding_fills_all_three_stores() {
        let corpus = DocumentStore::new();
        let lexical = LexicalIndex::new();
        let vectors = VectorStore::new(4);
        let embedder = ZeroEmbedder { dim: 4 };

        let count = seed_corpus(&corpus, &lexical, &vectors, &embedder)
            .await
            .unwrap();

        assert_eq!(count, seed_documents().len());
        assert_eq!(corpus.len(), count);
        assert_eq!(lexical.len(), count);
        assert_eq!(vectors.len(), count);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_stores_untouched() {
        let corpus = DocumentStore::new();
        let lexical = LexicalIndex::new();
        let vectors = VectorStore::new(4);

        let result = seed_corpus(&corpus, &lexical, &vectors, &FailingEmbedder).await;

        assert!(result.is_err());
        assert!(corpus.is_empty());
        assert!(lexical.is_empty());
        assert!(vectors.is_empty());
    }
}
