pub mod retrieval_eval_route;
