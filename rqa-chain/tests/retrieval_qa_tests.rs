//! Integration tests for the retrieval QA chain.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    ContextEchoGenerator, FailingGenerator, StalledGenerator, StalledRetriever, StaticRetriever,
    WordEmbedder,
};
use rqa_chain::{ChainError, RetrievalQAChain};
use rqa_prompt::{Bindings, ChatTemplate, MessageTemplate, PromptError, PromptTemplate, Role};
use rqa_rag::{Document, InMemoryVectorStore, Indexer, RagConfig, RetrievalOperation};
use tokio_util::sync::CancellationToken;

fn static_retriever(texts: &[&str]) -> Arc<StaticRetriever> {
    Arc::new(StaticRetriever {
        documents: texts.iter().map(|t| Document::new(*t)).collect(),
        fail: false,
    })
}

#[tokio::test]
async fn answers_from_single_chunk_corpus() {
    let indexer = Arc::new(
        Indexer::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(WordEmbedder { dimensions: 32 }))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap(),
    );
    let index = indexer.build(&[Document::new("The quick brown fox")]).await.unwrap();
    let generator = Arc::new(ContextEchoGenerator::default());

    let chain = RetrievalQAChain::builder()
        .retriever(Arc::new(indexer.retriever(index)))
        .generator(generator.clone())
        .top_k(1)
        .return_source_documents(true)
        .build()
        .unwrap();

    let output = chain.call("What animal is mentioned?", &Bindings::new()).await.unwrap();
    assert!(!output.text.is_empty());
    assert_eq!(output.text, "Answer based on: The quick brown fox");
    assert_eq!(output.source_documents, vec![Document::new("The quick brown fox")]);

    let transcripts = generator.transcripts();
    let transcript = &transcripts[0];
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[1].role, Role::Human);
    assert_eq!(transcript.messages()[1].text, "What animal is mentioned?");
}

#[tokio::test]
async fn context_joins_documents_in_retrieval_order() {
    let generator = Arc::new(ContextEchoGenerator::default());
    let chain = RetrievalQAChain::builder()
        .retriever(static_retriever(&["first", "second", "third"]))
        .generator(generator.clone())
        .top_k(2)
        .context_separator(" | ")
        .build()
        .unwrap();

    let answer = chain.run("anything").await.unwrap();
    assert_eq!(answer, "Answer based on: first | second");
}

#[tokio::test]
async fn query_key_is_supported() {
    let generator = Arc::new(ContextEchoGenerator::default());
    let chain = RetrievalQAChain::builder()
        .retriever(static_retriever(&["doc"]))
        .generator(generator.clone())
        .question_key("query")
        .build()
        .unwrap();

    chain.run("who?").await.unwrap();
    assert_eq!(chain.question_key(), "query");
    assert_eq!(generator.transcripts()[0].messages()[1].text, "who?");
}

#[tokio::test]
async fn retrieval_failure_surfaces_tagged_error() {
    let chain = RetrievalQAChain::builder()
        .retriever(Arc::new(StaticRetriever {
            documents: Vec::new(),
            fail: true,
        }))
        .generator(Arc::new(ContextEchoGenerator::default()))
        .build()
        .unwrap();

    let err = chain.run("q").await.unwrap_err();
    match err {
        ChainError::Retrieval(e) => assert_eq!(e.operation(), Some(RetrievalOperation::StoreQuery)),
        other => panic!("expected retrieval error, got {other:?}"),
    }
}

#[tokio::test]
async fn generation_failure_surfaces_and_chain_stays_usable() {
    let chain = RetrievalQAChain::builder()
        .retriever(static_retriever(&["doc"]))
        .generator(Arc::new(FailingGenerator))
        .build()
        .unwrap();

    for _ in 0..2 {
        let err = chain.run("q").await.unwrap_err();
        assert!(matches!(err, ChainError::Generation(ref g) if g.message == "quota exhausted"));
    }
}

#[tokio::test]
async fn missing_extra_variable_fails_before_generation() {
    let prompt = ChatTemplate::from_messages(vec![
        MessageTemplate::system(PromptTemplate::from_template("Context: {context}").unwrap()),
        MessageTemplate::human(
            PromptTemplate::from_template("Answer in {language}: {question}").unwrap(),
        ),
    ])
    .unwrap();
    let generator = Arc::new(ContextEchoGenerator::default());
    let chain = RetrievalQAChain::builder()
        .retriever(static_retriever(&["doc"]))
        .generator(generator.clone())
        .prompt(prompt)
        .build()
        .unwrap();

    let err = chain.run("q").await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Prompt(PromptError::MissingVariable { ref name }) if name == "language"
    ));
    assert!(generator.transcripts().is_empty());

    let output = chain.call("q", &Bindings::new().with("language", "French")).await.unwrap();
    assert!(output.source_documents.is_empty());
    assert_eq!(generator.transcripts()[0].messages()[1].text, "Answer in French: q");
}

#[tokio::test]
async fn cancelled_retrieval_never_reaches_the_generator() {
    let generator = Arc::new(ContextEchoGenerator::default());
    let chain = RetrievalQAChain::builder()
        .retriever(Arc::new(StalledRetriever))
        .generator(generator.clone())
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = chain.call_with_cancel("q", &Bindings::new(), &cancel).await.unwrap_err();
    assert!(matches!(err, ChainError::Cancelled));
    assert!(generator.transcripts().is_empty());
}

#[tokio::test]
async fn cancelled_generation_is_distinct_from_failure() {
    let chain = RetrievalQAChain::builder()
        .retriever(static_retriever(&["doc"]))
        .generator(Arc::new(StalledGenerator))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = chain.run_with_cancel("q", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn concurrent_queries_share_one_chain() {
    let chain = Arc::new(
        RetrievalQAChain::builder()
            .retriever(static_retriever(&["shared"]))
            .generator(Arc::new(ContextEchoGenerator::default()))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let chain = Arc::clone(&chain);
            tokio::spawn(async move { chain.run(&format!("question {i}")).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "Answer based on: shared");
    }
}

#[test]
fn prompt_without_context_is_a_construction_error() {
    let prompt = ChatTemplate::from_messages(vec![MessageTemplate::human(
        PromptTemplate::from_template("{question}").unwrap(),
    )])
    .unwrap();
    let err = RetrievalQAChain::builder()
        .retriever(static_retriever(&[]))
        .generator(Arc::new(FailingGenerator))
        .prompt(prompt)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ChainError::Construction(msg) if msg.contains("context")));
}

#[test]
fn missing_capabilities_and_zero_k_are_rejected() {
    assert!(RetrievalQAChain::builder().build().is_err());
    let err = RetrievalQAChain::builder()
        .retriever(static_retriever(&[]))
        .generator(Arc::new(FailingGenerator))
        .top_k(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ChainError::Construction(_)));
}

/// The context handed to the generator is exactly the first `top_k`
/// retrieved contents joined by the separator.
mod prop_context_composition {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn context_is_joined_top_k(
            texts in proptest::collection::vec("[a-z ]{1,20}", 0..8),
            top_k in 1usize..10,
        ) {
            let generator = Arc::new(ContextEchoGenerator::default());
            let chain = RetrievalQAChain::builder()
                .retriever(Arc::new(StaticRetriever {
                    documents: texts.iter().map(|t| Document::new(t.as_str())).collect(),
                    fail: false,
                }))
                .generator(generator.clone())
                .top_k(top_k)
                .context_separator("\n\n")
                .build()
                .unwrap();

            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(chain.run("q")).unwrap();

            let expected: Vec<&str> = texts.iter().take(top_k).map(String::as_str).collect();
            let transcripts = generator.transcripts();
            let system = &transcripts[0].messages()[0].text;
            let context = system.split_once("----------------\n").map(|(_, c)| c).unwrap();
            prop_assert_eq!(context, expected.join("\n\n"));
        }
    }
}
