use super::clock;
use super::clock::TimeHints;
use super::dto::*;
use super::served::Engine;
use super::served::watch;
use crate::config::Settings;
use crate::game::Board;
use crate::game::Stone;
use crate::mcts::Search;
use crate::mcts::SearchParams;
use crate::swap2::Negotiator;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use std::sync::Arc;

pub struct Server;

impl Server {
    pub async fn run(settings: Settings) -> Result<(), std::io::Error> {
        let bind = settings.bind_addr.clone();
        let engine = Arc::new(Engine::start(settings));
        tokio::spawn(watch(engine.clone()));
        let state = web::Data::from(engine);
        log::info!("starting inference server on {}", bind);
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(state.clone())
                .route("/get-move", web::post().to(get_move))
                .route("/health", web::get().to(health))
                .route("/swap2/propose", web::post().to(swap2_propose))
                .route("/swap2/second", web::post().to(swap2_second))
        })
        .workers(4)
        .bind(bind)?
        .run()
        .await
    }
}

async fn get_move(engine: web::Data<Engine>, body: web::Json<MoveRequest>) -> impl Responder {
    let Some(served) = engine.served() else {
        return HttpResponse::ServiceUnavailable().body("no model loaded");
    };
    let n = served.oracle.board_size();
    let request = body.into_inner();
    if request.board.len() != n || request.board.iter().any(|row| row.len() != n) {
        return HttpResponse::BadRequest()
            .body(format!("board must be {}x{}", n, n));
    }
    let Some(board) = Board::from_rows(&request.board) else {
        return HttpResponse::BadRequest().body("malformed board");
    };
    let moves = request
        .moves
        .as_ref()
        .map(|m| m.len())
        .unwrap_or_else(|| board.stones());

    if moves <= crate::BOOK_MAX_MOVES {
        if let Some(point) = engine.book.as_ref().and_then(|book| book.lookup(&board)) {
            if board.is_playable(point, request.player) {
                return HttpResponse::Ok().json(MoveResponse {
                    r#move: [point.row as i32, point.col as i32],
                    source: Some("book".into()),
                });
            }
        }
    }

    let hints = TimeHints {
        force_think_time_ms: request.force_think_time_ms,
        time_left_ms: request.time_left_ms,
        turn_limit_ms: request.turn_limit_ms,
        turn_ends_at: request.turn_ends_at,
    };
    let time_control = std::env::var("TIME_CONTROL").ok();
    let budget = clock::think_time(moves, hints, time_control.as_deref().or(Some("5+1")));
    let params = SearchParams::new(&engine.settings, budget).quiet();
    let seed = engine.seed();
    let player = request.player;
    let engine = engine.clone();
    let outcome = web::block(move || {
        let mut search = Search::new(&served.oracle, &engine.tt, params, seed);
        search.best_move(&board, player)
    })
    .await;
    match outcome {
        Ok(decision) => HttpResponse::Ok().json(MoveResponse {
            r#move: decision.sentinel(),
            source: None,
        }),
        Err(error) => {
            log::error!("search panicked: {}", error);
            HttpResponse::InternalServerError().body("search failed")
        }
    }
}

async fn health(engine: web::Data<Engine>) -> impl Responder {
    match engine.served() {
        Some(_) => HttpResponse::Ok().json(HealthResponse {
            ok: true,
            model_path: Some(engine.settings.prod_model_dir.clone()),
            error: None,
        }),
        None => HttpResponse::Ok().json(HealthResponse {
            ok: false,
            model_path: None,
            error: Some("no model loaded".into()),
        }),
    }
}

async fn swap2_propose(engine: web::Data<Engine>, _body: web::Json<Swap2Request>) -> impl Responder {
    let proposal = Negotiator::propose(engine.settings.board_size);
    HttpResponse::Ok().json(Swap2Response {
        board: proposal.rows(),
        to_move: Stone::White,
        swap_colors: None,
    })
}

async fn swap2_second(engine: web::Data<Engine>, body: web::Json<Swap2Request>) -> impl Responder {
    let Some(served) = engine.served() else {
        return HttpResponse::ServiceUnavailable().body("no model loaded");
    };
    let n = engine.settings.board_size;
    let board = match body.into_inner().board {
        Some(rows) => match Board::from_rows(&rows) {
            Some(board) if board.size() == n => board,
            _ => return HttpResponse::BadRequest().body(format!("board must be {}x{}", n, n)),
        },
        None => Negotiator::propose(n),
    };
    let outcome = web::block(move || Negotiator::new(&served.oracle).second(&board)).await;
    match outcome {
        Ok(opening) => HttpResponse::Ok().json(Swap2Response {
            board: opening.board.rows(),
            to_move: opening.to_move,
            swap_colors: Some(opening.swap_colors),
        }),
        Err(error) => {
            log::error!("swap2 negotiation panicked: {}", error);
            HttpResponse::InternalServerError().body("negotiation failed")
        }
    }
}
