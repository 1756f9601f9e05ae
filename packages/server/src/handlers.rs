//! HTTP handler functions for the inventory sync API.

use actix_web::{HttpResponse, web};
use inventory_sync_reconcile::{ChunkRequest, SyncContext, SyncError, run_chunk};
use inventory_sync_server_models::{ApiChunkResponse, ApiHealth, ChunkRequestParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/sync/chunk`
///
/// Reconciles one chunk of the catalog. An empty body, or missing fields,
/// default to offset 0 and the configured chunk size. A body that is not a
/// valid request is rejected with 400 before any remote call.
pub async fn sync_chunk(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let params = match parse_params(&body) {
        Ok(params) => params,
        Err(e) => {
            log::warn!("Rejected chunk request: {e}");
            return HttpResponse::BadRequest().json(ApiChunkResponse::failure(e.to_string()));
        }
    };
    let request = ChunkRequest::new(
        params.offset.unwrap_or(0),
        params
            .limit
            .unwrap_or_else(|| i64::try_from(state.config.default_limit).unwrap_or(i64::MAX)),
    );

    let ctx = SyncContext::new(
        state.erp.clone(),
        state.storefront.clone(),
        state.config.clone(),
        state.erp_location_id.clone(),
    );

    match run_chunk(&ctx, request, None).await {
        Ok(outcome) => HttpResponse::Ok().json(ApiChunkResponse::from_outcome(
            outcome,
            state.config.results_preview,
        )),
        Err(e) => {
            log::error!("Chunk at offset {} failed: {e}", request.offset);
            let body = ApiChunkResponse::failure(e.to_string());
            match e {
                SyncError::Validation { .. } => HttpResponse::BadRequest().json(body),
                SyncError::Upstream { .. }
                | SyncError::Auth(_)
                | SyncError::Erp(_)
                | SyncError::Storefront(_)
                | SyncError::NoLocation => HttpResponse::BadGateway().json(body),
                SyncError::Write { .. } => HttpResponse::InternalServerError().json(body),
            }
        }
    }
}

/// Parses the request body regardless of its content type. Blank bodies
/// take the defaults.
fn parse_params(body: &[u8]) -> Result<ChunkRequestParams, SyncError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChunkRequestParams::default());
    }
    serde_json::from_slice(body).map_err(|e| SyncError::Validation {
        message: format!("malformed body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use inventory_sync_catalog_models::{
        PriceSnapshot, ProductId, ProductRecord, QuantitySnapshot, TargetVariant,
    };
    use inventory_sync_config::SyncConfig;
    use inventory_sync_erp::{ErpError, ErpSource};
    use inventory_sync_storefront::{Location, PriceUpdate, Storefront, StorefrontError};

    use crate::{AppState, configure};

    #[derive(Default)]
    struct CountingErp {
        products: usize,
        fail_status: Option<u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ErpSource for CountingErp {
        async fn list_products(&self) -> Result<Vec<ProductRecord>, ErpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.fail_status {
                return Err(ErpError::Upstream {
                    status,
                    body: "down".to_string(),
                });
            }
            Ok((0..self.products)
                .map(|i| ProductRecord {
                    id: ProductId::from(i.to_string()),
                    sku: format!("SKU-{i}"),
                    attributes: Vec::new(),
                })
                .collect())
        }

        async fn list_quantities(&self, _location_id: &str) -> Result<QuantitySnapshot, ErpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QuantitySnapshot::new())
        }

        async fn list_prices(&self, _tier: u32) -> Result<PriceSnapshot, ErpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PriceSnapshot::new())
        }
    }

    struct EmptyStorefront;

    #[async_trait]
    impl Storefront for EmptyStorefront {
        async fn variants_by_skus(
            &self,
            _skus: &[String],
            _location_id: &str,
        ) -> Result<Vec<TargetVariant>, StorefrontError> {
            Ok(Vec::new())
        }

        async fn list_locations(&self) -> Result<Vec<Location>, StorefrontError> {
            Ok(vec![Location {
                id: "loc-1".to_string(),
                name: "Main".to_string(),
                is_active: true,
            }])
        }

        async fn set_quantity(
            &self,
            _inventory_item_id: &str,
            _quantity: i64,
            _location_id: &str,
        ) -> Result<(), StorefrontError> {
            Ok(())
        }

        async fn set_prices_bulk(
            &self,
            _product_id: &str,
            _prices: &[PriceUpdate],
        ) -> Result<(), StorefrontError> {
            Ok(())
        }
    }

    fn state(erp: Arc<CountingErp>) -> actix_web::web::Data<AppState> {
        actix_web::web::Data::new(AppState {
            erp,
            storefront: Arc::new(EmptyStorefront),
            config: SyncConfig::default(),
            erp_location_id: "1".to_string(),
        })
    }

    #[actix_rt::test]
    async fn health_reports_version() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(CountingErp::default())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
    }

    #[actix_rt::test]
    async fn rejects_zero_limit_without_calls() {
        let erp = Arc::new(CountingErp::default());
        let app = test::init_service(App::new().app_data(state(erp.clone())).configure(configure))
            .await;

        let req = test::TestRequest::post()
            .uri("/api/sync/chunk")
            .set_json(serde_json::json!({ "offset": 0, "limit": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["isComplete"], true);
        assert_eq!(erp.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_rt::test]
    async fn malformed_bodies_are_rejected_without_calls() {
        let bodies = [
            ("application/json", r#"{"offset":"-1","limit":5}"#),
            ("application/json", r#"{"offset":0,"limit":2.5}"#),
            ("application/json", r#"{"offset":99999999999999999999,"limit":5}"#),
            ("application/json", "offset=0&limit=5"),
            ("text/plain", r#"{"offset":-1,"limit":0}"#),
        ];

        for (content_type, payload) in bodies {
            let erp = Arc::new(CountingErp {
                products: 3,
                ..CountingErp::default()
            });
            let app =
                test::init_service(App::new().app_data(state(erp.clone())).configure(configure))
                    .await;

            let req = test::TestRequest::post()
                .uri("/api/sync/chunk")
                .insert_header(("content-type", content_type))
                .set_payload(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{payload}");

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["isComplete"], true);
            assert!(body["nextOffset"].is_null());
            assert_eq!(erp.calls.load(Ordering::SeqCst), 0, "{payload}");
        }
    }

    #[actix_rt::test]
    async fn plain_text_body_is_read_as_json() {
        let erp = Arc::new(CountingErp {
            products: 3,
            ..CountingErp::default()
        });
        let app = test::init_service(App::new().app_data(state(erp)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/sync/chunk")
            .insert_header(("content-type", "text/plain"))
            .set_payload(r#"{"offset":1,"limit":1}"#)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["processedRecords"], 1);
        assert_eq!(body["nextOffset"], 2);
    }

    #[actix_rt::test]
    async fn missing_body_uses_defaults() {
        let erp = Arc::new(CountingErp {
            products: 3,
            ..CountingErp::default()
        });
        let app = test::init_service(App::new().app_data(state(erp)).configure(configure)).await;

        let req = test::TestRequest::post().uri("/api/sync/chunk").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["isComplete"], true);
        assert_eq!(body["totalRecords"], 3);
        assert_eq!(body["totalChunks"], 1);
        assert_eq!(body["chunkResults"]["notFound"], 3);
        assert!(body["nextOffset"].is_null());
    }

    #[actix_rt::test]
    async fn upstream_failure_is_bad_gateway() {
        let erp = Arc::new(CountingErp {
            fail_status: Some(503),
            ..CountingErp::default()
        });
        let app = test::init_service(App::new().app_data(state(erp)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/sync/chunk")
            .set_json(serde_json::json!({ "offset": 0, "limit": 10 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["isComplete"], true);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }
}
