#![allow(dead_code)]

use fake::faker::lorem::en::Word;
use fake::Fake;
use pipeline_core::domain::{experiment_sort_fields, Experiment, NewExperiment};
use pipeline_core::{PageTokenCodec, PaginationContext, ResourceManager};

pub const TEST_SECRET: &str = "storage-tests-secret-key";

pub fn codec() -> PageTokenCodec {
    PageTokenCodec::new(TEST_SECRET)
}

/// First-page context for experiments.
pub fn first_page(sort_by: &str, page_size: i32) -> PaginationContext {
    codec()
        .decode("", sort_by, page_size, &experiment_sort_fields())
        .expect("valid listing request")
}

/// A draft with a random, non-empty name.
pub fn random_draft() -> NewExperiment {
    let word: String = Word().fake();
    NewExperiment::new(format!("{}-{}", word, uuid::Uuid::new_v4().simple()))
}

/// Walks every page of a listing through encoded tokens, the way a client
/// would, and returns the names per page.
pub async fn collect_pages<M>(store: &M, sort_by: &str, page_size: i32) -> Vec<Vec<String>>
where
    M: ResourceManager<Experiment> + ?Sized,
{
    let fields = experiment_sort_fields();
    let mut context = first_page(sort_by, page_size);
    let mut pages = Vec::new();

    loop {
        let page = store.list(&context).await.expect("list succeeds");
        pages.push(page.items.iter().map(|e| e.name.clone()).collect());

        if !page.more_available {
            return pages;
        }
        let last = page.items.last().expect("non-empty page when more remain");
        let token = codec()
            .encode(&context.next_page(last).expect("cursor from last item"))
            .expect("token encodes");
        context = codec()
            .decode(&token, sort_by, 0, &fields)
            .expect("own token decodes");
    }
}
