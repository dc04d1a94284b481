use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use crate::create::DEFAULT_MAX_PLAYERS;

#[derive(Parser, Debug)]
#[command(name = "mercenary", about = "Find and join nearby futsal matches")]
pub struct Args {
    #[arg(long, env = "MERCENARY_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,
    #[arg(long)]
    pub proxy: Option<String>,
    /// request timeout in seconds, none by default
    #[arg(long)]
    pub timeout: Option<u64>,
    #[arg(long, env = "MERCENARY_TOKEN_FILE", default_value = ".mercenary-token")]
    pub token_file: String,
    #[arg(long, env = "KAKAO_REST_API_KEY")]
    pub kakao_rest_key: Option<String>,
    #[arg(long, default_value = "http://localhost:5173/login/callback")]
    pub redirect_uri: String,
    #[arg(long, default_value = "127.0.0.1:5173")]
    pub listen: SocketAddr,
    /// acting user when the token carries no user id
    #[arg(long, default_value_t = 100)]
    pub user_id: u64,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in through kakao and keep the token
    Login,
    Logout,
    /// Show whether a token is stored
    Status,
    /// Matches around a point
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        #[arg(long, default_value_t = crate::board::DEFAULT_RADIUS_KM)]
        radius: f64,
        /// search a place by keyword and center there
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        place: Option<String>,
    },
    /// Every match
    All,
    Show {
        id: u64,
    },
    Apply {
        id: u64,
    },
    /// Post a new match, requires login
    Create(CreateArgs),
    /// Interactive board: list, map and detail together
    Board {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
        #[arg(long, default_value_t = crate::board::DEFAULT_RADIUS_KM)]
        radius: f64,
    },
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    /// road or parcel address, geocoded through kakao
    #[arg(long, required_unless_present_all = ["lat", "lng"])]
    pub address: Option<String>,
    #[arg(long)]
    pub building: Option<String>,
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,
    #[arg(long)]
    pub place: Option<String>,
    /// `YYYY-MM-DDTHH:MM`, an hour from now by default
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_PLAYERS)]
    pub max: u32,
    #[arg(long)]
    pub current: Option<u32>,
    #[arg(long)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["mercenary", "nearby", "--place", "강남역"]).unwrap();
        assert_eq!(args.redirect_uri, "http://localhost:5173/login/callback");
        assert_eq!(args.user_id, 100);
        assert_eq!(args.timeout, None);
        match args.command {
            Command::Nearby { radius, place, .. } => {
                assert_eq!(radius, 10.0);
                assert_eq!(place.as_deref(), Some("강남역"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_create_needs_a_location() {
        assert!(Args::try_parse_from(["mercenary", "create", "--title", "6vs6"]).is_err());
        let args = Args::try_parse_from([
            "mercenary", "create", "--title", "6vs6", "--lat", "37.5", "--lng", "127.0",
        ])
        .unwrap();
        let Command::Create(create) = args.command else {
            panic!("expected create");
        };
        assert_eq!(create.max, DEFAULT_MAX_PLAYERS);
        assert_eq!(create.lat, Some(37.5));
    }
}
