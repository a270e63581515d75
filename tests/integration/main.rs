mod crawl_tests;
mod dispatch_tests;
