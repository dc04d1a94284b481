use std::{cell::Cell, rc::Rc, sync::Arc, time::Duration};

use anyhow::{anyhow, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use mercenary_client::{
    api::MatchId,
    args::{Args, Command, CreateArgs},
    board::{list_error_message, Board, DEFAULT_RADIUS_KM},
    client::{Client, MatchApi},
    create::{CreateFlow, PostcodeSelection},
    detail::{DetailFlow, DetailState},
    geo::Coordinate,
    kakao::{authorize_url, KakaoLocal},
    list::{self, ListState},
    login::LoginFlow,
    map::{text::TextMap, MapView},
    service::{self, AppState},
    session::{FileTokenStore, Session},
};

const LOGIN_REQUIRED: &str = "로그인이 필요합니다. 먼저 `mercenary login`을 실행하세요.";

const HELP: &str = "\
list                 목록 보기
map                  지도 보기
refresh              다시 불러오기
center <lat> <lng>   중심 이동
search <장소>        장소 검색 후 이동
radius <km>          반경 변경
marker <n>           지도 마커 선택
open <id>            매치 상세
apply                열린 매치에 신청
close                상세 닫기
quit                 종료";

fn kakao(args: &Args) -> anyhow::Result<KakaoLocal> {
    let rest_key = args
        .kakao_rest_key
        .as_deref()
        .ok_or_else(|| anyhow!("a kakao rest api key is required (--kakao-rest-key)"))?;
    Ok(KakaoLocal::new(
        rest_key,
        args.proxy.as_deref(),
        args.timeout.map(Duration::from_secs),
    )?)
}

fn center_of(lat: Option<f64>, lng: Option<f64>) -> Coordinate {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
        _ => Coordinate::DEFAULT_CENTER,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let session = Session::open(FileTokenStore::new(&args.token_file))?;
    let client = Client::new(
        &args.api_url,
        args.proxy.as_deref(),
        args.timeout.map(Duration::from_secs),
        session.clone(),
    )?;
    let user_id = session.user_id().unwrap_or(args.user_id);
    log::debug!("acting as user {}", user_id);

    match &args.command {
        Command::Login => login(&args, client).await?,
        Command::Logout => {
            session.logout()?;
            println!("로그아웃 되었습니다.");
        }
        Command::Status => {
            if session.is_authenticated() {
                println!("로그인 상태 (사용자 {})", user_id);
            } else {
                println!("로그아웃 상태");
            }
        }
        Command::Nearby {
            lat,
            lng,
            radius,
            place,
        } => {
            let mut board = Board::new(&client, center_of(*lat, *lng), *radius);
            if let Some(keyword) = place {
                match board.search(&kakao(&args)?, keyword).await? {
                    Some(place) => println!("📍 {} ({})", place.name, place.address_name),
                    None => println!("'{}' 검색 결과가 없습니다.", keyword),
                }
            }
            board.fetch().await;
            if let Some(err) = board.error() {
                bail!("{}", err);
            }
            println!("{}", list::render(&board.list()));
        }
        Command::All => {
            let (matches, error) = match client.matches().await {
                Ok(matches) => (matches, None),
                Err(err) => {
                    log::warn!("RequestError: {}", err);
                    (vec![], Some(list_error_message(&err)))
                }
            };
            let state = ListState {
                matches: &matches,
                loading: false,
                error: error.as_deref(),
                radius_km: 0.0,
            };
            println!("{}", list::render(&state));
        }
        Command::Show { id } => {
            let mut detail = DetailFlow::new();
            detail.open(&client, MatchId(*id)).await;
            println!("{}", detail.render());
        }
        Command::Apply { id } => {
            let mut detail = DetailFlow::new();
            detail.open(&client, MatchId(*id)).await;
            let center = match detail.state() {
                DetailState::Loaded(found) => found
                    .summary
                    .position()
                    .unwrap_or(Coordinate::DEFAULT_CENTER),
                _ => Coordinate::DEFAULT_CENTER,
            };
            let mut board = Board::new(&client, center, DEFAULT_RADIUS_KM);
            let message = detail.apply(&client, user_id, &mut board).await;
            println!("{}", message);
            if board.generation() > 0 {
                println!("{}", list::render(&board.list()));
            }
        }
        Command::Create(create) => {
            if !session.is_authenticated() {
                bail!(LOGIN_REQUIRED);
            }
            create_match(&args, &client, user_id, create).await?;
        }
        Command::Board { lat, lng, radius } => {
            let kakao = if args.kakao_rest_key.is_some() {
                Some(kakao(&args)?)
            } else {
                None
            };
            run_board(&client, kakao, user_id, center_of(*lat, *lng), *radius).await?;
        }
    }

    Ok(())
}

async fn login(args: &Args, client: Client) -> anyhow::Result<()> {
    let rest_key = args
        .kakao_rest_key
        .as_deref()
        .ok_or_else(|| anyhow!("a kakao rest api key is required (--kakao-rest-key)"))?;
    let url = authorize_url(rest_key, &args.redirect_uri)?;
    let state = Arc::new(AppState::new(LoginFlow::new(client), url.clone()));

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    log::info!("login callback listening on {}", args.listen);
    println!("브라우저에서 아래 주소를 열어 카카오 로그인을 진행하세요:");
    println!("{}", url);
    println!("(또는 http://{}/login)", args.listen);

    service::serve_until_login(listener, state).await?;
    println!("로그인 되었습니다.");
    Ok(())
}

async fn create_match(
    args: &Args,
    client: &Client,
    user_id: u64,
    create: &CreateArgs,
) -> anyhow::Result<()> {
    let kakao = kakao(args)?;
    let mut flow = CreateFlow::new(user_id);

    let located = match (&create.address, create.lat, create.lng) {
        (Some(address), _, _) => {
            let selection = PostcodeSelection {
                road_address: address.clone(),
                jibun_address: String::new(),
                building_name: create.building.clone().unwrap_or_default(),
            };
            flow.select_address(&kakao, &selection).await.to_string()
        }
        (None, Some(lat), Some(lng)) => flow
            .pick_location(&kakao, Coordinate::new(lat, lng))
            .await
            .to_string(),
        _ => bail!("--address or --lat/--lng is required"),
    };
    println!("{}", located);

    let form = flow.form_mut();
    form.title = create.title.clone();
    if let Some(place) = &create.place {
        form.place_name = place.clone();
    }
    if let Some(date) = &create.date {
        form.match_date = date.clone();
    }
    if let Some(description) = &create.description {
        form.description = description.clone();
    }
    form.max_player_count = create.max;
    form.current_player_count = create.current;

    let center = flow.form().position();
    let mut board = Board::new(client, center, DEFAULT_RADIUS_KM);
    let message = flow.submit(client, &mut board).await;
    println!("{}", message);
    if board.generation() > 0 {
        println!("{}", list::render(&board.list()));
    }
    Ok(())
}

fn show_board<A: MatchApi>(board: &Board<A>, view: &mut MapView<TextMap>) {
    view.sync(board.generation(), board.matches());
    println!("{}", list::render(&board.list()));
}

async fn run_board(
    client: &Client,
    kakao: Option<KakaoLocal>,
    user_id: u64,
    center: Coordinate,
    radius: f64,
) -> anyhow::Result<()> {
    let mut board = Board::new(client, center, radius);
    let clicked = Rc::new(Cell::new(None));
    let sink = clicked.clone();
    let mut view = MapView::new(center, move |id| sink.set(Some(id)));
    view.mount(TextMap::new);
    let mut detail = DetailFlow::new();

    println!("{}", list::LOADING);
    board.fetch().await;
    show_board(&board, &mut view);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();
        match (command, rest.as_slice()) {
            ("quit" | "exit", _) => break,
            ("help", _) => println!("{}", HELP),
            ("list", _) => println!("{}", list::render(&board.list())),
            ("map", _) => {
                if let Some(map) = view.widget() {
                    println!("{}", map.render());
                }
            }
            ("refresh", _) => {
                board.fetch().await;
                show_board(&board, &mut view);
            }
            ("center", [lat, lng]) => match (lat.parse(), lng.parse()) {
                (Ok(lat), Ok(lng)) => {
                    let center = Coordinate::new(lat, lng);
                    board.recenter(center);
                    view.recenter(center);
                    board.fetch().await;
                    show_board(&board, &mut view);
                }
                _ => println!("좌표 형식이 올바르지 않습니다."),
            },
            ("search", words) if !words.is_empty() => {
                let Some(kakao) = &kakao else {
                    println!("장소 검색에는 카카오 REST 키가 필요합니다.");
                    continue;
                };
                let keyword = words.join(" ");
                match board.search(kakao, &keyword).await {
                    Ok(Some(place)) => {
                        println!("📍 {} ({})", place.name, place.address_name);
                        view.recenter(board.center());
                        board.fetch().await;
                        show_board(&board, &mut view);
                    }
                    Ok(None) => println!("'{}' 검색 결과가 없습니다.", keyword),
                    Err(err) => {
                        log::warn!("place search failed: {}", err);
                        println!("장소 검색에 실패했습니다.");
                    }
                }
            }
            ("radius", [km]) => match km.parse::<f64>() {
                Ok(km) if km > 0.0 => {
                    board.set_radius(km);
                    println!("반경 {}km", board.radius_km());
                    board.fetch().await;
                    show_board(&board, &mut view);
                }
                _ => println!("반경 형식이 올바르지 않습니다."),
            },
            ("marker", [n]) => {
                let marker = n.parse().ok().and_then(|n| view.click(n));
                if marker.is_none() {
                    println!("없는 마커입니다.");
                }
                if let Some(id) = clicked.take() {
                    if let Some(mat) = board.find(id) {
                        println!("📍 {} #{}", mat.place_name, mat.id);
                    }
                    detail.open(client, id).await;
                    println!("{}", detail.render());
                }
            }
            ("open", [id]) => match id.trim_start_matches('#').parse::<u64>() {
                Ok(id) => {
                    detail.open(client, MatchId(id)).await;
                    println!("{}", detail.render());
                }
                Err(_) => println!("매치 번호 형식이 올바르지 않습니다."),
            },
            ("apply", _) => {
                let before = board.generation();
                println!("{}", detail.apply(client, user_id, &mut board).await);
                if board.generation() != before {
                    show_board(&board, &mut view);
                }
            }
            ("close", _) => detail.close(),
            _ => println!("알 수 없는 명령입니다. help 로 목록을 확인하세요."),
        }
    }

    view.unmount();
    Ok(())
}
